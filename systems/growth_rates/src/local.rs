//! Beam quantities evaluated at a single optics point.

use ibs_kick_beam::{BeamParameters, OpticsPoint, OpticsSnapshot};
use ibs_kick_core::IbsError;

/// Local beam-frame description shared by every formalism.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LocalBeam {
    pub(crate) betx: f64,
    pub(crate) bety: f64,
    pub(crate) phix: f64,
    pub(crate) phiy: f64,
    /// `H_x / betx`, the dispersive invariant per unit beta.
    pub(crate) hx_over_betx: f64,
    pub(crate) hy_over_bety: f64,
    /// Inverse horizontal angular temperature `betx / εx`.
    pub(crate) ax: f64,
    pub(crate) ay: f64,
    /// Inverse longitudinal temperature including dispersion.
    pub(crate) a_s: f64,
    pub(crate) sigma_x: f64,
    pub(crate) sigma_y: f64,
}

impl LocalBeam {
    pub(crate) fn new(
        point: &OpticsPoint,
        beam: &BeamParameters,
        index: usize,
    ) -> Result<Self, IbsError> {
        if !(point.betx > 0.0 && point.bety > 0.0) {
            return Err(IbsError::numeric_failure(
                "optics",
                format!(
                    "beta functions must be positive at point {index}, got ({}, {})",
                    point.betx, point.bety
                ),
            ));
        }
        let phix = point.dpx + point.alfx * point.dx / point.betx;
        let phiy = point.dpy + point.alfy * point.dy / point.bety;
        let hx_over_betx = point.dx * point.dx / (point.betx * point.betx) + phix * phix;
        let hy_over_bety = point.dy * point.dy / (point.bety * point.bety) + phiy * phiy;
        let ax = point.betx / beam.gemitt_x;
        let ay = point.bety / beam.gemitt_y;
        let a_s = ax * hx_over_betx + 1.0 / (beam.sigma_delta * beam.sigma_delta);
        let sigma_x = (point.betx * beam.gemitt_x
            + point.dx * point.dx * beam.sigma_delta * beam.sigma_delta)
            .sqrt();
        let sigma_y = (point.bety * beam.gemitt_y
            + point.dy * point.dy * beam.sigma_delta * beam.sigma_delta)
            .sqrt();
        Ok(Self {
            betx: point.betx,
            bety: point.bety,
            phix,
            phiy,
            hx_over_betx,
            hy_over_bety,
            ax,
            ay,
            a_s,
            sigma_x,
            sigma_y,
        })
    }

    pub(crate) fn beam_area(&self) -> f64 {
        self.sigma_x * self.sigma_y
    }
}

/// Evaluates `LocalBeam` at every optics point together with the `s` positions.
pub(crate) fn local_beams(
    snapshot: &OpticsSnapshot<'_>,
) -> Result<(Vec<f64>, Vec<LocalBeam>), IbsError> {
    let beam = snapshot.beam();
    let points = snapshot.optics().points();
    let mut s = Vec::with_capacity(points.len());
    let mut locals = Vec::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        s.push(point.s);
        locals.push(LocalBeam::new(point, beam, index)?);
    }
    Ok((s, locals))
}

/// `N r0² c L_c / (12 π β³ γ⁵ σz)`, the common rate constant.
pub(crate) fn rate_constant(snapshot: &OpticsSnapshot<'_>, coulomb_log: f64) -> f64 {
    let reference = snapshot.reference();
    let beam = snapshot.beam();
    let r0 = reference.classical_radius();
    let beta = reference.beta0();
    let gamma = reference.gamma0();
    beam.num_particles * r0 * r0 * ibs_kick_core::SPEED_OF_LIGHT * coulomb_log
        / (12.0 * std::f64::consts::PI * beta.powi(3) * gamma.powi(5) * beam.bunch_length)
}

/// Rejects non-finite engine output.
pub(crate) fn ensure_finite(stage: &'static str, values: [f64; 3]) -> Result<[f64; 3], IbsError> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(values)
    } else {
        Err(IbsError::numeric_failure(
            stage,
            format!("non-finite result {values:?}"),
        ))
    }
}
