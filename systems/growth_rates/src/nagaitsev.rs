//! Nagaitsev closed-form growth rates.

use ibs_kick_beam::OpticsSnapshot;
use ibs_kick_core::{GrowthRates, IbsError};

use crate::{
    elliptic::carlson_rd,
    integrate::ring_average,
    local::{ensure_finite, local_beams, rate_constant, LocalBeam},
};

/// Growth rates from three `R_D` evaluations per optics point.
pub(crate) fn growth_rates(
    snapshot: &OpticsSnapshot<'_>,
    coulomb_log: f64,
) -> Result<GrowthRates, IbsError> {
    let gamma = snapshot.reference().gamma0();
    let (s, locals) = local_beams(snapshot)?;
    let integrals = locals
        .iter()
        .map(|local| point_integrals(local, gamma))
        .collect::<Result<Vec<_>, _>>()?;
    let [ix, iy, iz] = ring_average(&s, &integrals, snapshot.optics().circumference());

    let beam = snapshot.beam();
    let constant = rate_constant(snapshot, coulomb_log);
    let [tx, ty, tz] = ensure_finite(
        "nagaitsev",
        [
            constant * ix / beam.gemitt_x,
            constant * iy / beam.gemitt_y,
            constant * iz / (beam.sigma_delta * beam.sigma_delta),
        ],
    )?;
    Ok(GrowthRates::new(tx, ty, tz))
}

fn point_integrals(local: &LocalBeam, gamma: f64) -> Result<[f64; 3], IbsError> {
    let gamma2 = gamma * gamma;
    let a1 = 0.5 * (local.ax + gamma2 * local.a_s);
    let a2 = 0.5 * (local.ax - gamma2 * local.a_s);
    let coupling = gamma2 * local.ax * local.ax * local.phix * local.phix;
    let den = (a2 * a2 + coupling).sqrt();

    let lambda1 = local.ay;
    let lambda2 = a1 + den;
    let lambda3 = a1 - den;

    let r1 = carlson_rd(1.0 / lambda2, 1.0 / lambda3, 1.0 / lambda1)? / lambda1;
    let r2 = carlson_rd(1.0 / lambda3, 1.0 / lambda1, 1.0 / lambda2)? / lambda2;
    let r3 = carlson_rd(1.0 / lambda1, 1.0 / lambda2, 1.0 / lambda3)? / lambda3;

    // Degenerate eigenvalues: lambda2 == lambda3 and the split terms cancel.
    let (ratio, sxp) = if den > 0.0 {
        (
            3.0 * a2 / den,
            3.0 * gamma2 * local.phix * local.phix * local.ax / den * (r3 - r2),
        )
    } else {
        (0.0, 0.0)
    };
    let sp = 0.5 * gamma2 * (2.0 * r1 - r2 * (1.0 - ratio) - r3 * (1.0 + ratio));
    let sx = 0.5 * (2.0 * r1 - r2 * (1.0 + ratio) - r3 * (1.0 - ratio));

    let area = local.beam_area();
    Ok([
        local.betx / area * (sx + sp * local.hx_over_betx + sxp),
        local.bety / area * (r2 + r3 - 2.0 * r1),
        sp / area,
    ])
}
