//! Growth-rate driven kicks after R. Bruce et al.
//!
//! Every active particle receives a random momentum kick whose variance is
//! proportional to the analytical growth rate of its plane and to the line
//! density at its longitudinal position. The kick has no friction term, so
//! negative growth rates cannot be represented and are clamped to zero.

use std::{f64::consts::PI, num::NonZeroU64};

use ibs_kick_beam::{query, Coordinate, LatticeOptics, OpticsSnapshot, ParticleEnsemble};
use ibs_kick_core::{GrowthRates, IbsError, KickCoefficients, KickEvent, Plane};
use ibs_kick_system_growth_rates::{GrowthRateEngine, GrowthRateModel};
use ibs_kick_system_line_density::LineDensity;
use serde::{ser::Error as _, Serialize, Serializer};

use crate::{
    attach, draw_normals, serialization_refused, write_back, Attachment, IbsKickElement, Refresh,
};

const NAME: &str = "ibs_simple_kick";

/// Growth rates and the kick coefficients derived from them at one recomputation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimpleCoefficients {
    growth_rates: GrowthRates,
    kick: KickCoefficients,
}

impl SimpleCoefficients {
    /// Growth rates as computed, before clamping.
    #[must_use]
    pub const fn growth_rates(&self) -> GrowthRates {
        self.growth_rates
    }

    /// Kick coefficients `K_k = 2 √π σ_t T_k T_rev σ_k²`, from the clamped rates.
    #[must_use]
    pub const fn kick(&self) -> KickCoefficients {
        self.kick
    }

    fn compute<M: GrowthRateModel>(
        model: &M,
        optics: &LatticeOptics,
        particles: &ParticleEnsemble,
    ) -> Result<Self, IbsError> {
        let snapshot = OpticsSnapshot::from_ensemble(optics, particles)?;
        snapshot.beam().validate()?;
        let growth_rates = model.compute(&snapshot)?;
        let clamped = growth_rates.clamped();

        let point = optics.first();
        let variance = |coordinate| {
            let spread = query::active_std(particles, coordinate).ok_or_else(|| {
                IbsError::numeric_failure("kick coefficients", "no active particles")
            })?;
            Ok::<_, IbsError>(spread * spread)
        };
        let variances = [
            variance(Coordinate::Px)? / (1.0 + point.alfx * point.alfx),
            variance(Coordinate::Py)? / (1.0 + point.alfy * point.alfy),
            variance(Coordinate::Delta)?,
        ];
        let revolution_period = optics.revolution_period(particles.reference());
        let factor = 2.0 * PI.sqrt() * snapshot.beam().bunch_length * revolution_period;
        let [kx, ky, kz] =
            Plane::ALL.map(|plane| factor * clamped.get(plane) * variances[plane.index()]);
        if ![kx, ky, kz].iter().all(|value| value.is_finite()) {
            return Err(IbsError::numeric_failure(
                "kick coefficients",
                format!("non-finite coefficients ({kx}, {ky}, {kz})"),
            ));
        }
        Ok(Self {
            growth_rates,
            kick: KickCoefficients::new(kx, ky, kz),
        })
    }
}

/// Kick element applying growth-rate driven random kicks.
#[derive(Clone, Debug)]
pub struct SimpleKick<M = GrowthRateEngine> {
    model: M,
    line_density: LineDensity,
    attachment: Option<Attachment<SimpleCoefficients>>,
}

impl SimpleKick<GrowthRateEngine> {
    /// Creates a disabled element for the named formalism.
    ///
    /// Fails with [`IbsError::InvalidConfiguration`] for an unknown formalism
    /// or a zero slice count.
    pub fn new(formalism: &str, num_slices: usize) -> Result<Self, IbsError> {
        Self::with_model(GrowthRateEngine::new(formalism)?, num_slices)
    }
}

impl<M: GrowthRateModel> SimpleKick<M> {
    /// Creates a disabled element driven by an arbitrary growth-rate model.
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
    pub fn coefficients(&self) -> Option<SimpleCoefficients> {
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

impl<M: GrowthRateModel> IbsKickElement for SimpleKick<M> {
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
            SimpleCoefficients::compute(model, optics, particles)
        })?;
        if refresh == Refresh::Recomputed {
            out.push(KickEvent::CoefficientsRecomputed { turn });
            let rates = coefficients.growth_rates();
            log::debug!(
                "recomputed simple kick coefficients at turn {turn}: {:?}",
                coefficients.kick().as_tuple()
            );
            for plane in Plane::ALL {
                let rate = rates.get(plane);
                if rate < 0.0 {
                    log::warn!(
                        "negative {plane} growth rate {rate:.4e} at turn {turn} clamped to zero; \
                         the simple kick cannot represent damping, consider the kinetic kick"
                    );
                    out.push(KickEvent::GrowthRateClamped { plane, turn, rate });
                }
            }
        }

        let weights = self.line_density.estimate_active(particles);
        let normals = draw_normals(particles, active.len());
        let scale = attachment.scale_strength;
        let kick = coefficients.kick();
        let increments = Plane::ALL.map(|plane| {
            let coefficient = kick.get(plane);
            normals[plane.index()]
                .iter()
                .zip(&weights)
                .map(|(normal, weight)| scale * normal * (weight * coefficient).sqrt())
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

impl<M> Serialize for SimpleKick<M> {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom(serialization_refused(NAME)))
    }
}
