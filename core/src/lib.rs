#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the IBS kick engine.
//!
//! This crate defines the vocabulary that connects the beam state, the
//! coefficient systems and the kick applicators. Formalism engines produce
//! immutable coefficient bundles ([`GrowthRates`], [`DiffusionCoefficients`],
//! [`FrictionCoefficients`]), applicators turn them into
//! [`KickCoefficients`] and report what they did through [`KickEvent`]
//! values. Every fallible operation across the workspace returns
//! [`IbsError`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod error;

pub use error::IbsError;

/// Speed of light in vacuum, in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Coulomb constant times the elementary charge squared, `e² / (4π ε0)`, in eV·m.
pub const COULOMB_CONSTANT_EV_M: f64 = 1.439_964_548e-9;

/// Reduced Planck constant times the speed of light, `ħc`, in eV·m.
pub const HBAR_C_EV_M: f64 = 1.973_269_804e-7;

/// Proton rest mass in eV.
pub const PROTON_MASS_EV: f64 = 938.272_088_16e6;

/// Phase-space planes a coefficient or kick refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plane {
    /// Horizontal betatron plane, kicked through `px`.
    Horizontal,
    /// Vertical betatron plane, kicked through `py`.
    Vertical,
    /// Longitudinal plane, kicked through `delta`.
    Longitudinal,
}

impl Plane {
    /// All planes in the fixed `(x, y, z)` order used by coefficient tuples.
    pub const ALL: [Plane; 3] = [Plane::Horizontal, Plane::Vertical, Plane::Longitudinal];

    /// Position of the plane inside a fixed-order tuple.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Horizontal => 0,
            Self::Vertical => 1,
            Self::Longitudinal => 2,
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::Longitudinal => "longitudinal",
        };
        f.write_str(label)
    }
}

/// Analytical formalism used to evaluate IBS growth rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Formalism {
    /// Nagaitsev's closed form based on Carlson's `R_D` integrals.
    Nagaitsev,
    /// Bjorken-Mtingwa integral over the coupling matrices.
    BjorkenMtingwa,
}

impl Formalism {
    /// Parses a user supplied formalism name.
    ///
    /// Accepts `Nagaitsev`, `Bjorken-Mtingwa` and the `B&M` alias, all
    /// compared case-insensitively after trimming surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, IbsError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nagaitsev" => Ok(Self::Nagaitsev),
            "bjorken-mtingwa" | "b&m" => Ok(Self::BjorkenMtingwa),
            _ => Err(IbsError::invalid_configuration(
                "formalism",
                format!(
                    "unknown formalism `{value}`, expected `Nagaitsev`, `Bjorken-Mtingwa` or `B&M`"
                ),
            )),
        }
    }

    /// Canonical display name of the formalism.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nagaitsev => "Nagaitsev",
            Self::BjorkenMtingwa => "Bjorken-Mtingwa",
        }
    }
}

impl FromStr for Formalism {
    type Err = IbsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for Formalism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Analytical IBS emittance growth rates, in 1/s.
///
/// Values may be negative when the formalism predicts damping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthRates {
    tx: f64,
    ty: f64,
    tz: f64,
}

impl GrowthRates {
    /// Creates growth rates from the horizontal, vertical and longitudinal values.
    #[must_use]
    pub const fn new(tx: f64, ty: f64, tz: f64) -> Self {
        Self { tx, ty, tz }
    }

    /// Horizontal emittance growth rate.
    #[must_use]
    pub const fn tx(&self) -> f64 {
        self.tx
    }

    /// Vertical emittance growth rate.
    #[must_use]
    pub const fn ty(&self) -> f64 {
        self.ty
    }

    /// Longitudinal emittance growth rate.
    #[must_use]
    pub const fn tz(&self) -> f64 {
        self.tz
    }

    /// Rate for the requested plane.
    #[must_use]
    pub const fn get(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Horizontal => self.tx,
            Plane::Vertical => self.ty,
            Plane::Longitudinal => self.tz,
        }
    }

    /// Rates as an `(x, y, z)` tuple.
    #[must_use]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.tx, self.ty, self.tz)
    }

    /// Reports whether every rate is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.tx.is_finite() && self.ty.is_finite() && self.tz.is_finite()
    }

    /// Copy of the rates with negative values replaced by zero.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self::new(self.tx.max(0.0), self.ty.max(0.0), self.tz.max(0.0))
    }
}

/// Diffusion coefficients of the kinetic formalism.
///
/// Each value is the growth of the momentum variance per unit time for its
/// plane, and is non-negative by construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffusionCoefficients {
    dx: f64,
    dy: f64,
    dz: f64,
}

impl DiffusionCoefficients {
    /// Creates diffusion coefficients from the per-plane values.
    #[must_use]
    pub const fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Horizontal diffusion coefficient.
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.dx
    }

    /// Vertical diffusion coefficient.
    #[must_use]
    pub const fn dy(&self) -> f64 {
        self.dy
    }

    /// Longitudinal diffusion coefficient.
    #[must_use]
    pub const fn dz(&self) -> f64 {
        self.dz
    }

    /// Coefficient for the requested plane.
    #[must_use]
    pub const fn get(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Horizontal => self.dx,
            Plane::Vertical => self.dy,
            Plane::Longitudinal => self.dz,
        }
    }

    /// Coefficients as an `(x, y, z)` tuple.
    #[must_use]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.dx, self.dy, self.dz)
    }
}

/// Friction coefficients of the kinetic formalism, in 1/s.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrictionCoefficients {
    fx: f64,
    fy: f64,
    fz: f64,
}

impl FrictionCoefficients {
    /// Creates friction coefficients from the per-plane values.
    #[must_use]
    pub const fn new(fx: f64, fy: f64, fz: f64) -> Self {
        Self { fx, fy, fz }
    }

    /// Horizontal friction coefficient.
    #[must_use]
    pub const fn fx(&self) -> f64 {
        self.fx
    }

    /// Vertical friction coefficient.
    #[must_use]
    pub const fn fy(&self) -> f64 {
        self.fy
    }

    /// Longitudinal friction coefficient.
    #[must_use]
    pub const fn fz(&self) -> f64 {
        self.fz
    }

    /// Coefficient for the requested plane.
    #[must_use]
    pub const fn get(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Horizontal => self.fx,
            Plane::Vertical => self.fy,
            Plane::Longitudinal => self.fz,
        }
    }

    /// Coefficients as an `(x, y, z)` tuple.
    #[must_use]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.fx, self.fy, self.fz)
    }
}

/// Scale factors applied to the random momentum kicks.
///
/// A kick coefficient is the momentum variance injected per unit of line
/// density weight, so a particle with weight `w` receives `n · √(w · K)`
/// for a standard-normal draw `n`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KickCoefficients {
    kx: f64,
    ky: f64,
    kz: f64,
}

impl KickCoefficients {
    /// Creates kick coefficients from the per-plane values.
    #[must_use]
    pub const fn new(kx: f64, ky: f64, kz: f64) -> Self {
        Self { kx, ky, kz }
    }

    /// Horizontal kick coefficient.
    #[must_use]
    pub const fn kx(&self) -> f64 {
        self.kx
    }

    /// Vertical kick coefficient.
    #[must_use]
    pub const fn ky(&self) -> f64 {
        self.ky
    }

    /// Longitudinal kick coefficient.
    #[must_use]
    pub const fn kz(&self) -> f64 {
        self.kz
    }

    /// Coefficient for the requested plane.
    #[must_use]
    pub const fn get(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Horizontal => self.kx,
            Plane::Vertical => self.ky,
            Plane::Longitudinal => self.kz,
        }
    }

    /// Coefficients as an `(x, y, z)` tuple.
    #[must_use]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.kx, self.ky, self.kz)
    }
}

/// Diagnostics reported by kick elements while tracking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KickEvent {
    /// The element recomputed its coefficient bundle.
    CoefficientsRecomputed {
        /// Turn at which the new bundle was computed.
        turn: u64,
    },
    /// A negative growth rate was clamped to zero during a recomputation.
    GrowthRateClamped {
        /// Plane whose growth rate was negative.
        plane: Plane,
        /// Turn at which the clamped bundle was computed.
        turn: u64,
        /// Growth rate reported by the formalism before clamping.
        rate: f64,
    },
    /// Momentum kicks were written back to the ensemble.
    KicksApplied {
        /// Turn the kicks were applied on.
        turn: u64,
        /// Number of active particles that received a kick.
        particles: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::{Formalism, GrowthRates, IbsError, Plane};

    #[test]
    fn formalism_names_are_case_insensitive() {
        assert_eq!(Formalism::parse("NAGAITSEV"), Ok(Formalism::Nagaitsev));
        assert_eq!(Formalism::parse("nagaitsev"), Ok(Formalism::Nagaitsev));
        assert_eq!(
            Formalism::parse("bjorken-mtingwa"),
            Ok(Formalism::BjorkenMtingwa)
        );
        assert_eq!(Formalism::parse("B&M"), Ok(Formalism::BjorkenMtingwa));
        assert_eq!(Formalism::parse("b&m"), Ok(Formalism::BjorkenMtingwa));
        assert_eq!(
            " Bjorken-Mtingwa ".parse::<Formalism>(),
            Ok(Formalism::BjorkenMtingwa)
        );
    }

    #[test]
    fn unknown_formalism_is_invalid_configuration() {
        match Formalism::parse("quadrupole") {
            Err(IbsError::InvalidConfiguration { parameter, .. }) => {
                assert_eq!(parameter, "formalism");
            }
            other => panic!("expected invalid configuration, got {other:?}"),
        }
    }

    #[test]
    fn clamping_only_touches_negative_rates() {
        let rates = GrowthRates::new(1.5, -0.25, 0.0);
        assert_eq!(rates.clamped().as_tuple(), (1.5, 0.0, 0.0));
        assert_eq!(rates.get(Plane::Vertical), -0.25);
    }

    #[test]
    fn plane_indices_follow_tuple_order() {
        let indices: Vec<_> = Plane::ALL.iter().map(|plane| plane.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn growth_rates_round_trip_through_bincode() {
        let rates = GrowthRates::new(2.0e-4, -1.0e-6, 3.5e-5);
        let bytes = bincode::serialize(&rates).expect("serialize");
        let restored: GrowthRates = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, rates);
    }
}
