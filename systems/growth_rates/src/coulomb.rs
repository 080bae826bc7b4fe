//! Coulomb logarithm of the bunch.

use ibs_kick_beam::OpticsSnapshot;
use ibs_kick_core::IbsError;

use crate::{integrate::ring_average, local::local_beams};

/// Ring-averaged `ln(b_max / b_min)`.
///
/// At every optics point the maximum impact parameter is the smaller
/// transverse beam size. The minimum is the larger of the classical distance
/// of closest approach `r0 / β⊥²` and the quantum limit `ƛ_C / (2 β⊥)`, with
/// `β⊥ = βγ √(εx / βx)` the transverse velocity spread in the beam frame.
pub fn coulomb_logarithm(snapshot: &OpticsSnapshot<'_>) -> Result<f64, IbsError> {
    snapshot.beam().validate()?;
    let reference = snapshot.reference();
    let beam = snapshot.beam();
    let r0 = reference.classical_radius();
    let compton = reference.reduced_compton_wavelength();
    let beta_gamma = reference.beta0() * reference.gamma0();

    let (s, locals) = local_beams(snapshot)?;
    let logs: Vec<[f64; 1]> = locals
        .iter()
        .map(|local| {
            let transverse = beta_gamma * (beam.gemitt_x / local.betx).sqrt();
            let b_max = local.sigma_x.min(local.sigma_y);
            let b_min = (r0 / (transverse * transverse)).max(compton / (2.0 * transverse));
            [(b_max / b_min).ln()]
        })
        .collect();
    let [average] = ring_average(&s, &logs, snapshot.optics().circumference());
    if !(average.is_finite() && average > 0.0) {
        return Err(IbsError::numeric_failure(
            "coulomb logarithm",
            format!("expected a positive finite value, got {average}"),
        ));
    }
    Ok(average)
}

/// Uses the configured override when present, the computed logarithm otherwise.
pub(crate) fn resolve(
    configured: Option<f64>,
    snapshot: &OpticsSnapshot<'_>,
) -> Result<f64, IbsError> {
    match configured {
        Some(value) => Ok(value),
        None => coulomb_logarithm(snapshot),
    }
}

/// Checks a configured Coulomb logarithm override.
pub(crate) fn validate_override(value: f64) -> Result<f64, IbsError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(IbsError::invalid_configuration(
            "coulomb_log",
            format!("Coulomb logarithm must be positive and finite, got {value}"),
        ))
    }
}
