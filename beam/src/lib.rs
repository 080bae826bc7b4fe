#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Particle ensemble, execution context and optics inputs for the IBS kick engine.
//!
//! The tracking engine owns a [`ParticleEnsemble`] and lends it to kick
//! elements once per turn. Every array computation a kick performs is routed
//! through the [`ops::ArrayOps`] backend bound to the ensemble's
//! [`ExecutionContext`], together with the seeded generator that supplies the
//! random component of the kicks.

use ibs_kick_core::{
    IbsError, Plane, COULOMB_CONSTANT_EV_M, HBAR_C_EV_M, PROTON_MASS_EV, SPEED_OF_LIGHT,
};

pub mod context;
pub mod ops;
pub mod optics;
pub mod query;

pub use context::ExecutionContext;
pub use optics::{BeamParameters, LatticeOptics, OpticsPoint, OpticsSnapshot};

/// Liveness value carried by particles that take part in tracking.
pub const STATE_ACTIVE: i64 = 1;

/// Liveness value assigned to particles that were lost.
pub const STATE_LOST: i64 = 0;

/// Reference particle of the ensemble.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceParticle {
    mass0: f64,
    charge0: f64,
    gamma0: f64,
}

impl ReferenceParticle {
    /// Creates a reference particle from its rest mass in eV, charge in units
    /// of the elementary charge and relativistic Lorentz factor.
    pub fn new(mass0: f64, charge0: f64, gamma0: f64) -> Result<Self, IbsError> {
        if !(mass0.is_finite() && mass0 > 0.0) {
            return Err(IbsError::invalid_configuration(
                "mass0",
                format!("rest mass must be positive, got {mass0}"),
            ));
        }
        if !charge0.is_finite() || charge0 == 0.0 {
            return Err(IbsError::invalid_configuration(
                "charge0",
                format!("charge must be non-zero, got {charge0}"),
            ));
        }
        if !(gamma0.is_finite() && gamma0 > 1.0) {
            return Err(IbsError::invalid_configuration(
                "gamma0",
                format!("Lorentz factor must exceed one, got {gamma0}"),
            ));
        }
        Ok(Self {
            mass0,
            charge0,
            gamma0,
        })
    }

    /// Proton reference particle at the provided Lorentz factor.
    pub fn proton(gamma0: f64) -> Result<Self, IbsError> {
        Self::new(PROTON_MASS_EV, 1.0, gamma0)
    }

    /// Relativistic Lorentz factor.
    #[must_use]
    pub const fn gamma0(&self) -> f64 {
        self.gamma0
    }

    /// Relativistic velocity factor.
    #[must_use]
    pub fn beta0(&self) -> f64 {
        (1.0 - 1.0 / (self.gamma0 * self.gamma0)).sqrt()
    }

    /// Classical particle radius in m.
    #[must_use]
    pub fn classical_radius(&self) -> f64 {
        self.charge0 * self.charge0 * COULOMB_CONSTANT_EV_M / self.mass0
    }

    /// Reduced Compton wavelength in m.
    #[must_use]
    pub fn reduced_compton_wavelength(&self) -> f64 {
        HBAR_C_EV_M / self.mass0
    }

    /// Particle velocity in m/s.
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.beta0() * SPEED_OF_LIGHT
    }
}

/// Phase-space coordinates stored per particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Coordinate {
    /// Horizontal position in m.
    X,
    /// Horizontal momentum normalized to the reference momentum.
    Px,
    /// Vertical position in m.
    Y,
    /// Vertical momentum normalized to the reference momentum.
    Py,
    /// Longitudinal position relative to the reference particle in m.
    Zeta,
    /// Relative momentum deviation.
    Delta,
}

impl Coordinate {
    /// Every coordinate in storage order.
    pub const ALL: [Self; 6] = [Self::X, Self::Px, Self::Y, Self::Py, Self::Zeta, Self::Delta];

    /// Momentum coordinate that receives kicks for the provided plane.
    #[must_use]
    pub const fn momentum(plane: Plane) -> Self {
        match plane {
            Plane::Horizontal => Self::Px,
            Plane::Vertical => Self::Py,
            Plane::Longitudinal => Self::Delta,
        }
    }
}

/// Column storage for the six phase-space coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleCoordinates {
    /// Horizontal positions.
    pub x: Vec<f64>,
    /// Horizontal momenta.
    pub px: Vec<f64>,
    /// Vertical positions.
    pub y: Vec<f64>,
    /// Vertical momenta.
    pub py: Vec<f64>,
    /// Longitudinal positions.
    pub zeta: Vec<f64>,
    /// Momentum deviations.
    pub delta: Vec<f64>,
}

impl ParticleCoordinates {
    /// Coordinates for `len` particles sitting on the reference orbit.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            x: vec![0.0; len],
            px: vec![0.0; len],
            y: vec![0.0; len],
            py: vec![0.0; len],
            zeta: vec![0.0; len],
            delta: vec![0.0; len],
        }
    }

    fn column(&self, coordinate: Coordinate) -> &[f64] {
        match coordinate {
            Coordinate::X => &self.x,
            Coordinate::Px => &self.px,
            Coordinate::Y => &self.y,
            Coordinate::Py => &self.py,
            Coordinate::Zeta => &self.zeta,
            Coordinate::Delta => &self.delta,
        }
    }

    fn column_mut(&mut self, coordinate: Coordinate) -> &mut [f64] {
        match coordinate {
            Coordinate::X => &mut self.x,
            Coordinate::Px => &mut self.px,
            Coordinate::Y => &mut self.y,
            Coordinate::Py => &mut self.py,
            Coordinate::Zeta => &mut self.zeta,
            Coordinate::Delta => &mut self.delta,
        }
    }

    fn uniform_len(&self) -> Option<usize> {
        let len = self.x.len();
        let columns = [
            &self.px,
            &self.y,
            &self.py,
            &self.zeta,
            &self.delta,
        ];
        columns
            .iter()
            .all(|column| column.len() == len)
            .then_some(len)
    }
}

/// Ordered collection of macro-particles tracked through the lattice.
#[derive(Clone, Debug)]
pub struct ParticleEnsemble {
    reference: ReferenceParticle,
    coordinates: ParticleCoordinates,
    state: Vec<i64>,
    weight: f64,
    at_turn: u64,
    context: ExecutionContext,
}

impl ParticleEnsemble {
    /// Creates an ensemble where every particle starts active at turn zero.
    ///
    /// `weight` is the number of real particles represented by each
    /// macro-particle.
    pub fn new(
        reference: ReferenceParticle,
        coordinates: ParticleCoordinates,
        weight: f64,
        context: ExecutionContext,
    ) -> Result<Self, IbsError> {
        let Some(len) = coordinates.uniform_len() else {
            return Err(IbsError::invalid_configuration(
                "coordinates",
                "all coordinate columns must have the same length",
            ));
        };
        if !(weight.is_finite() && weight > 0.0) {
            return Err(IbsError::invalid_configuration(
                "weight",
                format!("macro-particle weight must be positive, got {weight}"),
            ));
        }
        Ok(Self {
            reference,
            coordinates,
            state: vec![STATE_ACTIVE; len],
            weight,
            at_turn: 0,
            context,
        })
    }

    /// Number of macro-particles, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Reports whether the ensemble holds no macro-particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Reference particle shared by the ensemble.
    #[must_use]
    pub const fn reference(&self) -> &ReferenceParticle {
        &self.reference
    }

    /// Real particles per macro-particle.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Values of one coordinate for every particle.
    #[must_use]
    pub fn coordinate(&self, coordinate: Coordinate) -> &[f64] {
        self.coordinates.column(coordinate)
    }

    /// Mutable values of one coordinate for every particle.
    pub fn coordinate_mut(&mut self, coordinate: Coordinate) -> &mut [f64] {
        self.coordinates.column_mut(coordinate)
    }

    /// Liveness flags, one per particle.
    #[must_use]
    pub fn state(&self) -> &[i64] {
        &self.state
    }

    /// Reports whether the particle at `index` takes part in tracking.
    #[must_use]
    pub fn is_active(&self, index: usize) -> bool {
        self.state.get(index).is_some_and(|state| *state > 0)
    }

    /// Marks the particle at `index` as lost. Returns `false` for an unknown index.
    pub fn mark_lost(&mut self, index: usize) -> bool {
        match self.state.get_mut(index) {
            Some(state) => {
                *state = STATE_LOST;
                true
            }
            None => false,
        }
    }

    /// Indices of the active particles in ensemble order.
    #[must_use]
    pub fn active_indices(&self) -> Vec<usize> {
        self.state
            .iter()
            .enumerate()
            .filter_map(|(index, state)| (*state > 0).then_some(index))
            .collect()
    }

    /// Number of active particles.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state.iter().filter(|state| **state > 0).count()
    }

    /// Values of one coordinate restricted to the active particles.
    #[must_use]
    pub fn active_values(&self, coordinate: Coordinate) -> Vec<f64> {
        self.coordinate(coordinate)
            .iter()
            .zip(&self.state)
            .filter_map(|(value, state)| (*state > 0).then_some(*value))
            .collect()
    }

    /// Turn the ensemble is currently at.
    #[must_use]
    pub const fn at_turn(&self) -> u64 {
        self.at_turn
    }

    /// Moves the ensemble to the next turn.
    pub fn advance_turn(&mut self) {
        self.at_turn += 1;
    }

    /// Sets the turn counter, for drivers that resume or restart a run.
    pub fn set_turn(&mut self, turn: u64) {
        self.at_turn = turn;
    }

    /// Execution context bound to the ensemble.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Mutable execution context, used to draw random numbers.
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }
}
