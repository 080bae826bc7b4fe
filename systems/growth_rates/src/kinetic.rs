//! Diffusion and friction coefficients of the kinetic formalism.

use ibs_kick_beam::OpticsSnapshot;
use ibs_kick_core::{
    DiffusionCoefficients, FrictionCoefficients, GrowthRates, IbsError, Plane,
};

use crate::{
    coulomb,
    elliptic::carlson_rd,
    integrate::ring_average,
    local::{ensure_finite, local_beams, rate_constant, LocalBeam},
};

/// Diffusion and friction computed together at one recomputation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KineticCoefficients {
    diffusion: DiffusionCoefficients,
    friction: FrictionCoefficients,
}

impl KineticCoefficients {
    /// Pairs diffusion and friction coefficients.
    #[must_use]
    pub const fn new(diffusion: DiffusionCoefficients, friction: FrictionCoefficients) -> Self {
        Self {
            diffusion,
            friction,
        }
    }

    /// Momentum diffusion per second.
    #[must_use]
    pub const fn diffusion(&self) -> DiffusionCoefficients {
        self.diffusion
    }

    /// Momentum friction per second.
    #[must_use]
    pub const fn friction(&self) -> FrictionCoefficients {
        self.friction
    }

    /// Emittance growth rates `D_k / σ_k² − 2 F_k` for the provided momentum
    /// variances, ordered by [`Plane`].
    ///
    /// A momentum variance `σ_k²` evolves as `D_k − 2 F_k σ_k²`, so these are
    /// also the relative variance growth rates the kinetic kick applies.
    #[must_use]
    pub fn growth_rates(&self, momentum_variances: [f64; 3]) -> GrowthRates {
        let rate = |plane: Plane| {
            self.diffusion.get(plane) / momentum_variances[plane.index()]
                - 2.0 * self.friction.get(plane)
        };
        GrowthRates::new(
            rate(Plane::Horizontal),
            rate(Plane::Vertical),
            rate(Plane::Longitudinal),
        )
    }
}

/// Source of kinetic coefficients for [`KineticCoefficients`]-driven kicks.
pub trait KineticModel {
    /// Computes the coefficients for the provided snapshot.
    fn compute(&self, snapshot: &OpticsSnapshot<'_>) -> Result<KineticCoefficients, IbsError>;
}

/// Kinetic engine evaluating the local beam-frame temperatures along the ring.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KineticEngine {
    coulomb_log: Option<f64>,
}

impl KineticEngine {
    /// Engine computing the Coulomb logarithm from the beam.
    #[must_use]
    pub const fn new() -> Self {
        Self { coulomb_log: None }
    }

    /// Replaces the computed Coulomb logarithm by a fixed value.
    pub fn with_coulomb_log(mut self, coulomb_log: f64) -> Result<Self, IbsError> {
        self.coulomb_log = Some(coulomb::validate_override(coulomb_log)?);
        Ok(self)
    }

    /// Configured Coulomb logarithm override, if any.
    #[must_use]
    pub const fn coulomb_log(&self) -> Option<f64> {
        self.coulomb_log
    }
}

impl KineticModel for KineticEngine {
    fn compute(&self, snapshot: &OpticsSnapshot<'_>) -> Result<KineticCoefficients, IbsError> {
        snapshot.beam().validate()?;
        let coulomb_log = coulomb::resolve(self.coulomb_log, snapshot)?;
        let gamma = snapshot.reference().gamma0();
        let (s, locals) = local_beams(snapshot)?;
        let per_point = locals
            .iter()
            .map(|local| point_coefficients(local, gamma))
            .collect::<Result<Vec<_>, _>>()?;
        let circumference = snapshot.optics().circumference();
        let [dx, dy, dz, fx, fy, fz] = ring_average(&s, &per_point, circumference);

        let constant = rate_constant(snapshot, coulomb_log);
        let [dx, dy, dz] = ensure_finite("kinetic diffusion", [dx, dy, dz].map(|d| constant * d))?;
        let [fx, fy, fz] = ensure_finite("kinetic friction", [fx, fy, fz].map(|f| constant * f))?;
        log::debug!(
            "kinetic coefficients with coulomb log {coulomb_log:.3}: D = ({dx:.3e}, {dy:.3e}, {dz:.3e}), F = ({fx:.3e}, {fy:.3e}, {fz:.3e})"
        );
        Ok(KineticCoefficients::new(
            DiffusionCoefficients::new(dx, dy, dz),
            FrictionCoefficients::new(fx, fy, fz),
        ))
    }
}

fn point_coefficients(local: &LocalBeam, gamma: f64) -> Result<[f64; 6], IbsError> {
    let gamma2 = gamma * gamma;
    let temperature_x = 1.0 / local.ax;
    let temperature_y = 1.0 / local.ay;
    let temperature_z = 1.0 / (gamma2 * local.a_s);

    let rd_x = carlson_rd(temperature_y, temperature_z, temperature_x)?;
    let rd_y = carlson_rd(temperature_z, temperature_x, temperature_y)?;
    let rd_z = carlson_rd(temperature_x, temperature_y, temperature_z)?;
    let partial = [
        temperature_x * rd_x,
        temperature_y * rd_y,
        temperature_z * rd_z,
    ];
    let total: f64 = partial.iter().sum();

    let area = local.beam_area();
    Ok([
        (total - partial[0]) / area,
        (total - partial[1]) / area,
        gamma2 * (total - partial[2]) / area,
        rd_x / area,
        rd_y / area,
        rd_z / area,
    ])
}
