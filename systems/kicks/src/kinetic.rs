//! Kinetic kicks combining friction with random diffusion.
//!
//! The friction term damps each momentum in proportion to its own value and
//! the diffusion term adds a random kick, both scaled by the local line
//! density. Diffusion is non-negative by construction, so no clamping is
//! needed and the kick stays meaningful below transition.

use std::{f64::consts::PI, num::NonZeroU64};

use ibs_kick_beam::{query, Coordinate, LatticeOptics, OpticsSnapshot, ParticleEnsemble};
use ibs_kick_core::{IbsError, KickEvent, Plane};
use ibs_kick_system_growth_rates::{KineticCoefficients, KineticEngine, KineticModel};
use ibs_kick_system_line_density::LineDensity;
use serde::{ser::Error as _, Serialize, Serializer};

use crate::{
    attach, draw_normals, serialization_refused, write_back, Attachment, IbsKickElement, Refresh,
};

const NAME: &str = "ibs_kinetic_kick";

/// Kick element applying friction and diffusion kicks.
#[derive(Clone, Debug)]
pub struct KineticKick<M = KineticEngine> {
    model: M,
    line_density: LineDensity,
    attachment: Option<Attachment<KineticCoefficients>>,
}

impl KineticKick<KineticEngine> {
    /// Creates a disabled element with the default kinetic engine.
    pub fn new(num_slices: usize) -> Result<Self, IbsError> {
        Self::with_model(KineticEngine::new(), num_slices)
    }
}

impl<M: KineticModel> KineticKick<M> {
    /// Creates a disabled element driven by an arbitrary kinetic model.
    pub fn with_model(model: M, num_slices: usize) -> Result<Self, IbsError> {
        Ok(Self {
            model,
            line_density: LineDensity::new(num_slices)?,
            attachment: None,
        })
    }

    /// Number of slices of the line density estimate.
    #[must_use]
    pub const fn num_slices(&self) -> usize {
        self.line_density.num_slices()
    }

    /// Recomputation period, once configured.
    #[must_use]
    pub fn update_every(&self) -> Option<NonZeroU64> {
        self.attachment
            .as_ref()
            .map(|attachment| attachment.cache.update_every())
    }

    /// Scale strength, zero while unconfigured.
    #[must_use]
    pub fn scale_strength(&self) -> f64 {
        self.attachment
            .as_ref()
            .map_or(0.0, |attachment| attachment.scale_strength)
    }

    /// Coefficients of the last recomputation.
    #[must_use]
    pub fn coefficients(&self) -> Option<KineticCoefficients> {
        self.attachment
            .as_ref()
            .and_then(|attachment| attachment.cache.bundle().copied())
    }

    /// Turn of the last recomputation.
    #[must_use]
    pub fn cached_turn(&self) -> Option<u64> {
        self.attachment
            .as_ref()
            .and_then(|attachment| attachment.cache.cached_turn())
    }
}

impl<M: KineticModel> IbsKickElement for KineticKick<M> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn attach(
        &mut self,
        optics: LatticeOptics,
        update_every: NonZeroU64,
        scale_strength: f64,
    ) -> Result<(), IbsError> {
        attach(&mut self.attachment, optics, update_every, scale_strength)
    }

    fn is_enabled(&self) -> bool {
        self.attachment.as_ref().is_some_and(Attachment::is_enabled)
    }

    fn track(
        &mut self,
        particles: &mut ParticleEnsemble,
        out: &mut Vec<KickEvent>,
    ) -> Result<(), IbsError> {
        let Some(attachment) = self.attachment.as_mut().filter(|a| a.is_enabled()) else {
            return Ok(());
        };
        let active = particles.active_indices();
        if active.is_empty() {
            return Ok(());
        }

        let turn = particles.at_turn();
        let model = &self.model;
        let optics = &attachment.optics;
        let (coefficients, refresh) = attachment.cache.maybe_update(turn, || {
            let snapshot = OpticsSnapshot::from_ensemble(optics, particles)?;
            snapshot.beam().validate()?;
            model.compute(&snapshot)
        })?;
        if refresh == Refresh::Recomputed {
            out.push(KickEvent::CoefficientsRecomputed { turn });
            log::debug!(
                "recomputed kinetic kick coefficients at turn {turn}: D = {:?}, F = {:?}",
                coefficients.diffusion().as_tuple(),
                coefficients.friction().as_tuple()
            );
        }

        let bunch_length = query::bunch_length(particles).unwrap_or(0.0);
        let revolution_period = attachment.optics.revolution_period(particles.reference());
        // Exposure averages to one revolution period over a Gaussian bunch.
        let exposure: Vec<f64> = self
            .line_density
            .estimate_active(particles)
            .into_iter()
            .map(|weight| weight * 2.0 * PI.sqrt() * bunch_length * revolution_period)
            .collect();

        let momenta = Plane::ALL.map(|plane| {
            let values = particles.coordinate(Coordinate::momentum(plane));
            active.iter().map(|index| values[*index]).collect::<Vec<_>>()
        });
        let normals = draw_normals(particles, active.len());
        let scale = attachment.scale_strength;
        let increments = Plane::ALL.map(|plane| {
            let diffusion = coefficients.diffusion().get(plane);
            let friction = coefficients.friction().get(plane);
            momenta[plane.index()]
                .iter()
                .zip(&normals[plane.index()])
                .zip(&exposure)
                .map(|((momentum, normal), exposure)| {
                    scale * (-friction * momentum * exposure + normal * (diffusion * exposure).sqrt())
                })
                .collect::<Vec<_>>()
        });
        write_back(particles, &active, &increments)?;
        out.push(KickEvent::KicksApplied {
            turn,
            particles: active.len(),
        });
        Ok(())
    }
}

impl<M> Serialize for KineticKick<M> {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom(serialization_refused(NAME)))
    }
}
