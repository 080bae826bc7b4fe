#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Intra-beam scattering kick elements.
//!
//! A kick element is placed in a tracking line and called once per turn. It
//! keeps its coefficients in a [`CoefficientCache`], weights every particle by
//! the local line density and adds random momentum kicks to the active
//! particles. Elements start disabled and only act after
//! [`configure_intrabeam_scattering`] attached optics and a non-zero scale
//! strength.

use std::num::NonZeroU64;

use ibs_kick_beam::{Coordinate, LatticeOptics, ParticleEnsemble};
use ibs_kick_core::{IbsError, KickEvent, Plane};

pub mod cache;
pub mod configure;
pub mod kinetic;
pub mod simple;

pub use cache::{CacheState, CoefficientCache, Refresh};
pub use configure::{configure_intrabeam_scattering, IbsConfiguration};
pub use kinetic::KineticKick;
pub use simple::{SimpleCoefficients, SimpleKick};

/// Capability shared by every IBS kick element.
pub trait IbsKickElement {
    /// Short identifier of the element kind.
    fn name(&self) -> &'static str;

    /// Attaches lattice optics and enables the element with `scale_strength`.
    ///
    /// Re-attaching keeps the recomputation period: a different
    /// `update_every` fails with [`IbsError::InvalidConfiguration`], the same
    /// value replaces the optics and drops the cached coefficients.
    fn attach(
        &mut self,
        optics: LatticeOptics,
        update_every: NonZeroU64,
        scale_strength: f64,
    ) -> Result<(), IbsError>;

    /// Reports whether `track` modifies particles.
    fn is_enabled(&self) -> bool;

    /// Applies one turn of kicks to the active particles of `particles`.
    ///
    /// Diagnostics are appended to `out`. On error no particle is modified.
    fn track(
        &mut self,
        particles: &mut ParticleEnsemble,
        out: &mut Vec<KickEvent>,
    ) -> Result<(), IbsError>;

    /// Serialises the element for storage in a saved line.
    ///
    /// Kick elements hold per-run state and always refuse.
    fn serialize_element(&self) -> Result<String, IbsError> {
        Err(serialization_refused(self.name()))
    }
}

/// Optics, strength and cache of an attached element.
#[derive(Clone, Debug)]
pub(crate) struct Attachment<B> {
    pub(crate) optics: LatticeOptics,
    pub(crate) scale_strength: f64,
    pub(crate) cache: CoefficientCache<B>,
}

impl<B: Clone> Attachment<B> {
    pub(crate) fn is_enabled(&self) -> bool {
        self.scale_strength != 0.0
    }
}

pub(crate) fn attach<B: Clone>(
    slot: &mut Option<Attachment<B>>,
    optics: LatticeOptics,
    update_every: NonZeroU64,
    scale_strength: f64,
) -> Result<(), IbsError> {
    if !scale_strength.is_finite() {
        return Err(IbsError::invalid_configuration(
            "scale_strength",
            format!("scale strength must be finite, got {scale_strength}"),
        ));
    }
    match slot {
        Some(existing) if existing.cache.update_every() != update_every => {
            Err(IbsError::invalid_configuration(
                "update_every",
                format!(
                    "element already recomputes every {} turns, cannot change to {}",
                    existing.cache.update_every(),
                    update_every
                ),
            ))
        }
        Some(existing) => {
            existing.optics = optics;
            existing.scale_strength = scale_strength;
            existing.cache.reset();
            Ok(())
        }
        None => {
            *slot = Some(Attachment {
                optics,
                scale_strength,
                cache: CoefficientCache::new(update_every),
            });
            Ok(())
        }
    }
}

pub(crate) fn serialization_refused(name: &str) -> IbsError {
    IbsError::UnsupportedOperation {
        operation: format!("`{name}` elements cannot be serialized as part of a line"),
    }
}

/// Draws one standard-normal value per active particle, for `px`, `py` and `delta` in turn.
pub(crate) fn draw_normals(particles: &mut ParticleEnsemble, count: usize) -> [Vec<f64>; 3] {
    Plane::ALL.map(|_| particles.context_mut().standard_normal(count))
}

/// Adds per-plane increments to the momenta of the `active` particles.
///
/// Nothing is written unless every increment is finite.
pub(crate) fn write_back(
    particles: &mut ParticleEnsemble,
    active: &[usize],
    increments: &[Vec<f64>; 3],
) -> Result<(), IbsError> {
    for (plane, values) in Plane::ALL.iter().zip(increments) {
        if let Some(value) = values.iter().find(|value| !value.is_finite()) {
            return Err(IbsError::numeric_failure(
                "kick application",
                format!("non-finite {plane} increment {value}"),
            ));
        }
    }
    for (plane, values) in Plane::ALL.iter().zip(increments) {
        let momenta = particles.coordinate_mut(Coordinate::momentum(*plane));
        for (index, increment) in active.iter().zip(values) {
            momenta[*index] += increment;
        }
    }
    Ok(())
}
