//! Lattice optics and beam parameters consumed by the coefficient engines.

use ibs_kick_core::IbsError;
use serde::{Deserialize, Serialize};

use crate::{query, Coordinate, ParticleEnsemble, ReferenceParticle};

/// Optical functions at one location `s` along the ring.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpticsPoint {
    /// Longitudinal position in m.
    pub s: f64,
    /// Horizontal beta function in m.
    pub betx: f64,
    /// Vertical beta function in m.
    pub bety: f64,
    /// Horizontal alpha function.
    #[serde(default)]
    pub alfx: f64,
    /// Vertical alpha function.
    #[serde(default)]
    pub alfy: f64,
    /// Horizontal dispersion in m.
    #[serde(default)]
    pub dx: f64,
    /// Derivative of the horizontal dispersion.
    #[serde(default)]
    pub dpx: f64,
    /// Vertical dispersion in m.
    #[serde(default)]
    pub dy: f64,
    /// Derivative of the vertical dispersion.
    #[serde(default)]
    pub dpy: f64,
}

impl OpticsPoint {
    /// Uncoupled point without dispersion or alpha functions.
    #[must_use]
    pub const fn new(s: f64, betx: f64, bety: f64) -> Self {
        Self {
            s,
            betx,
            bety,
            alfx: 0.0,
            alfy: 0.0,
            dx: 0.0,
            dpx: 0.0,
            dy: 0.0,
            dpy: 0.0,
        }
    }

    /// Returns the point with the provided alpha functions.
    #[must_use]
    pub const fn with_alphas(mut self, alfx: f64, alfy: f64) -> Self {
        self.alfx = alfx;
        self.alfy = alfy;
        self
    }

    /// Returns the point with the provided horizontal dispersion and its derivative.
    #[must_use]
    pub const fn with_horizontal_dispersion(mut self, dx: f64, dpx: f64) -> Self {
        self.dx = dx;
        self.dpx = dpx;
        self
    }
}

/// Ordered optical functions along the ring, produced by an external optics code.
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeOptics {
    points: Vec<OpticsPoint>,
    circumference: f64,
}

impl LatticeOptics {
    /// Validates and stores the optics table.
    ///
    /// Points must be non-empty, finite and sorted by non-decreasing `s`, and
    /// the circumference must be positive.
    pub fn new(points: Vec<OpticsPoint>, circumference: f64) -> Result<Self, IbsError> {
        if points.is_empty() {
            return Err(IbsError::invalid_configuration(
                "optics",
                "at least one optics point is required",
            ));
        }
        if !(circumference.is_finite() && circumference > 0.0) {
            return Err(IbsError::invalid_configuration(
                "circumference",
                format!("circumference must be positive, got {circumference}"),
            ));
        }
        for (index, point) in points.iter().enumerate() {
            let values = [
                point.s, point.betx, point.bety, point.alfx, point.alfy, point.dx, point.dpx,
                point.dy, point.dpy,
            ];
            if values.iter().any(|value| !value.is_finite()) {
                return Err(IbsError::invalid_configuration(
                    "optics",
                    format!("optics point {index} holds a non-finite value"),
                ));
            }
        }
        if points.windows(2).any(|pair| pair[1].s < pair[0].s) {
            return Err(IbsError::invalid_configuration(
                "optics",
                "optics points must be ordered by non-decreasing s",
            ));
        }
        Ok(Self {
            points,
            circumference,
        })
    }

    /// Optics points in order of increasing `s`.
    #[must_use]
    pub fn points(&self) -> &[OpticsPoint] {
        &self.points
    }

    /// Ring circumference in m.
    #[must_use]
    pub const fn circumference(&self) -> f64 {
        self.circumference
    }

    /// Optics at the first point, taken as the kick location.
    #[must_use]
    pub fn first(&self) -> &OpticsPoint {
        &self.points[0]
    }

    /// Distance between the first and the last optics point.
    #[must_use]
    pub fn s_span(&self) -> f64 {
        self.points[self.points.len() - 1].s - self.points[0].s
    }

    /// Revolution period in s for the provided reference particle.
    #[must_use]
    pub fn revolution_period(&self, reference: &ReferenceParticle) -> f64 {
        self.circumference / reference.velocity()
    }
}

/// Bunch properties that enter the coefficient computations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamParameters {
    /// Number of real particles in the bunch.
    pub num_particles: f64,
    /// Horizontal geometric emittance in m.
    pub gemitt_x: f64,
    /// Vertical geometric emittance in m.
    pub gemitt_y: f64,
    /// Relative momentum spread.
    pub sigma_delta: f64,
    /// RMS bunch length in m.
    pub bunch_length: f64,
}

impl BeamParameters {
    /// Derives the beam parameters from the active particles.
    ///
    /// Emittances are computed at the first optics point with the dispersive
    /// contribution removed. The population counts active macro-particles times
    /// their weight.
    pub fn from_ensemble(
        particles: &ParticleEnsemble,
        optics: &LatticeOptics,
    ) -> Result<Self, IbsError> {
        let active = particles.active_count();
        if active == 0 {
            return Err(IbsError::numeric_failure(
                "beam parameters",
                "no active particles",
            ));
        }
        let missing = || IbsError::numeric_failure("beam parameters", "empty active population");
        let sigma_delta = query::sigma_delta(particles).ok_or_else(missing)?;
        let bunch_length = query::bunch_length(particles).ok_or_else(missing)?;
        let gemitt_x = query::geometric_emittance(particles, optics, Coordinate::X, sigma_delta)
            .ok_or_else(missing)?;
        let gemitt_y = query::geometric_emittance(particles, optics, Coordinate::Y, sigma_delta)
            .ok_or_else(missing)?;

        Ok(Self {
            num_particles: active as f64 * particles.weight(),
            gemitt_x,
            gemitt_y,
            sigma_delta,
            bunch_length,
        })
    }

    /// Fails with a numeric failure unless every parameter is positive and finite.
    pub fn validate(&self) -> Result<(), IbsError> {
        let checks = [
            ("num_particles", self.num_particles),
            ("gemitt_x", self.gemitt_x),
            ("gemitt_y", self.gemitt_y),
            ("sigma_delta", self.sigma_delta),
            ("bunch_length", self.bunch_length),
        ];
        for (name, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(IbsError::numeric_failure(
                    "beam parameters",
                    format!("{name} must be positive and finite, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Read-only bundle of everything a coefficient recomputation needs.
#[derive(Clone, Copy, Debug)]
pub struct OpticsSnapshot<'a> {
    optics: &'a LatticeOptics,
    reference: ReferenceParticle,
    beam: BeamParameters,
}

impl<'a> OpticsSnapshot<'a> {
    /// Assembles a snapshot from its parts.
    #[must_use]
    pub const fn new(
        optics: &'a LatticeOptics,
        reference: ReferenceParticle,
        beam: BeamParameters,
    ) -> Self {
        Self {
            optics,
            reference,
            beam,
        }
    }

    /// Builds a snapshot from the current state of the active particles.
    pub fn from_ensemble(
        optics: &'a LatticeOptics,
        particles: &ParticleEnsemble,
    ) -> Result<Self, IbsError> {
        let beam = BeamParameters::from_ensemble(particles, optics)?;
        Ok(Self::new(optics, *particles.reference(), beam))
    }

    /// Lattice optics.
    #[must_use]
    pub const fn optics(&self) -> &'a LatticeOptics {
        self.optics
    }

    /// Reference particle.
    #[must_use]
    pub const fn reference(&self) -> &ReferenceParticle {
        &self.reference
    }

    /// Beam parameters.
    #[must_use]
    pub const fn beam(&self) -> &BeamParameters {
        &self.beam
    }
}
