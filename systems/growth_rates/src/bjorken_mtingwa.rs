//! Bjorken-Mtingwa growth rates from the coupling-matrix integral.

use std::f64::consts::PI;

use ibs_kick_beam::{BeamParameters, OpticsSnapshot};
use ibs_kick_core::{GrowthRates, IbsError, SPEED_OF_LIGHT};
use nalgebra::Matrix3;

use crate::{
    integrate::{ring_average, simpson},
    local::{ensure_finite, local_beams, LocalBeam},
};

/// Simpson intervals over the logarithmic `λ` range.
const LOG_INTERVALS: usize = 800;

/// E-folds added beyond the matrix scales on either side.
const LOG_MARGIN: f64 = 20.0;

/// Growth rates from `∫ √λ / √det(L+λI) · [Tr L_i Tr M⁻¹ − 3 Tr(L_i M⁻¹)] dλ`.
pub(crate) fn growth_rates(
    snapshot: &OpticsSnapshot<'_>,
    coulomb_log: f64,
) -> Result<GrowthRates, IbsError> {
    let reference = snapshot.reference();
    let beam = snapshot.beam();
    let gamma = reference.gamma0();
    let (s, locals) = local_beams(snapshot)?;
    let integrals: Vec<[f64; 3]> = locals
        .iter()
        .map(|local| point_integrals(local, gamma, beam))
        .collect();
    let averaged = ring_average(&s, &integrals, snapshot.optics().circumference());

    let r0 = reference.classical_radius();
    let beta = reference.beta0();
    let a = r0 * r0 * SPEED_OF_LIGHT * beam.num_particles * coulomb_log
        / (64.0
            * PI
            * PI
            * beta.powi(3)
            * gamma.powi(4)
            * beam.gemitt_x
            * beam.gemitt_y
            * beam.bunch_length
            * beam.sigma_delta);
    let prefactor = 8.0 * PI * a;
    let [tx, ty, tz] = ensure_finite("bjorken-mtingwa", averaged.map(|value| prefactor * value))?;
    Ok(GrowthRates::new(tx, ty, tz))
}

fn point_integrals(local: &LocalBeam, gamma: f64, beam: &BeamParameters) -> [f64; 3] {
    let gamma2 = gamma * gamma;
    let lp = Matrix3::new(
        0.0,
        0.0,
        0.0,
        0.0,
        gamma2 / (beam.sigma_delta * beam.sigma_delta),
        0.0,
        0.0,
        0.0,
        0.0,
    );
    let lx = local.ax
        * Matrix3::new(
            1.0,
            -gamma * local.phix,
            0.0,
            -gamma * local.phix,
            gamma2 * local.hx_over_betx,
            0.0,
            0.0,
            0.0,
            0.0,
        );
    let ly = local.ay
        * Matrix3::new(
            0.0,
            0.0,
            0.0,
            0.0,
            gamma2 * local.hy_over_bety,
            -gamma * local.phiy,
            0.0,
            -gamma * local.phiy,
            1.0,
        );
    let total = lp + lx + ly;
    let planes = [lx, ly, lp];
    let traces = planes.map(|plane| plane.trace());

    let lower = total[(0, 0)].min(total[(2, 2)]).ln() - LOG_MARGIN;
    let upper = total.trace().ln() + LOG_MARGIN;

    simpson(lower, upper, LOG_INTERVALS, |u| {
        let lambda = u.exp();
        let shifted = total + Matrix3::identity() * lambda;
        let determinant = shifted.determinant();
        let Some(inverse) = shifted.try_inverse() else {
            return [f64::NAN; 3];
        };
        // dλ = λ du
        let base = lambda.sqrt() / determinant.sqrt() * lambda;
        let inverse_trace = inverse.trace();
        let mut values = [0.0; 3];
        for (value, (plane, trace)) in values.iter_mut().zip(planes.iter().zip(traces)) {
            *value = base * (trace * inverse_trace - 3.0 * (plane * &inverse).trace());
        }
        values
    })
}
