//! Statistics over the active particles, computed through the ensemble's backend.

use crate::{Coordinate, LatticeOptics, ParticleEnsemble};

/// Mean of one coordinate over the active particles.
#[must_use]
pub fn active_mean(particles: &ParticleEnsemble, coordinate: Coordinate) -> Option<f64> {
    let values = particles.active_values(coordinate);
    particles.context().ops().mean(&values)
}

/// Population standard deviation of one coordinate over the active particles.
#[must_use]
pub fn active_std(particles: &ParticleEnsemble, coordinate: Coordinate) -> Option<f64> {
    let values = particles.active_values(coordinate);
    particles.context().ops().std(&values)
}

/// RMS bunch length in m.
#[must_use]
pub fn bunch_length(particles: &ParticleEnsemble) -> Option<f64> {
    active_std(particles, Coordinate::Zeta)
}

/// RMS relative momentum spread.
#[must_use]
pub fn sigma_delta(particles: &ParticleEnsemble) -> Option<f64> {
    active_std(particles, Coordinate::Delta)
}

/// Geometric emittance of a transverse plane at the first optics point.
///
/// The dispersive contribution `(D σδ)²` is removed from the beam size before
/// dividing by beta. Returns `None` for a longitudinal or momentum coordinate
/// and for an empty active population.
#[must_use]
pub fn geometric_emittance(
    particles: &ParticleEnsemble,
    optics: &LatticeOptics,
    coordinate: Coordinate,
    sigma_delta: f64,
) -> Option<f64> {
    let point = optics.first();
    let (beta, dispersion) = match coordinate {
        Coordinate::X => (point.betx, point.dx),
        Coordinate::Y => (point.bety, point.dy),
        _ => return None,
    };
    let sigma = active_std(particles, coordinate)?;
    let dispersive = dispersion * sigma_delta;
    Some((sigma * sigma - dispersive * dispersive) / beta)
}
