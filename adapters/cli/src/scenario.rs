//! JSON scenario describing a tracking run.

use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use ibs_kick_beam::{LatticeOptics, OpticsPoint, ReferenceParticle};
use ibs_kick_core::{IbsError, PROTON_MASS_EV};
use ibs_kick_system_growth_rates::{GrowthRateEngine, KineticEngine};
use ibs_kick_system_kicks::{IbsConfiguration, IbsKickElement, KineticKick, SimpleKick};
use serde::Deserialize;

/// Complete description of a tracking run.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    pub(crate) reference: ReferenceConfig,
    pub(crate) optics: OpticsConfig,
    pub(crate) bunch: BunchConfig,
    pub(crate) tunes: TuneConfig,
    pub(crate) kick: KickConfig,
    pub(crate) ibs: IbsConfiguration,
    pub(crate) turns: u64,
    #[serde(default = "default_report_every")]
    pub(crate) report_every: u64,
    #[serde(default)]
    pub(crate) seed: u64,
}

const fn default_report_every() -> u64 {
    100
}

impl Scenario {
    /// Reads and checks a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))?;
        scenario.check()?;
        Ok(scenario)
    }

    fn check(&self) -> Result<()> {
        ensure!(self.report_every > 0, "report_every must be positive");
        ensure!(
            self.bunch.macroparticles > 0,
            "bunch.macroparticles must be positive"
        );
        for (name, value) in [
            ("bunch.intensity", self.bunch.intensity),
            ("bunch.nemitt_x", self.bunch.nemitt_x),
            ("bunch.nemitt_y", self.bunch.nemitt_y),
            ("bunch.sigma_delta", self.bunch.sigma_delta),
            ("bunch.bunch_length", self.bunch.bunch_length),
        ] {
            ensure!(
                value.is_finite() && value > 0.0,
                "{name} must be positive, got {value}"
            );
        }
        Ok(())
    }
}

/// Reference particle of the bunch, a proton unless overridden.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReferenceConfig {
    pub(crate) gamma0: f64,
    #[serde(default = "default_mass0")]
    pub(crate) mass0: f64,
    #[serde(default = "default_charge0")]
    pub(crate) charge0: f64,
}

const fn default_mass0() -> f64 {
    PROTON_MASS_EV
}

const fn default_charge0() -> f64 {
    1.0
}

impl ReferenceConfig {
    pub(crate) fn build(&self) -> Result<ReferenceParticle, IbsError> {
        ReferenceParticle::new(self.mass0, self.charge0, self.gamma0)
    }
}

/// Sampled lattice functions around the ring.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct OpticsConfig {
    pub(crate) circumference: f64,
    pub(crate) points: Vec<OpticsPoint>,
}

impl OpticsConfig {
    pub(crate) fn build(&self) -> Result<LatticeOptics, IbsError> {
        LatticeOptics::new(self.points.clone(), self.circumference)
    }
}

/// Initial Gaussian bunch, matched to the first optics point.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BunchConfig {
    pub(crate) macroparticles: usize,
    /// Real particles in the bunch.
    pub(crate) intensity: f64,
    /// Normalised horizontal emittance in m.
    pub(crate) nemitt_x: f64,
    /// Normalised vertical emittance in m.
    pub(crate) nemitt_y: f64,
    pub(crate) sigma_delta: f64,
    /// RMS bunch length in m.
    pub(crate) bunch_length: f64,
}

/// Fractional tunes of the linear one-turn map.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TuneConfig {
    pub(crate) qx: f64,
    pub(crate) qy: f64,
    pub(crate) qs: f64,
}

/// Kick element placed after the one-turn map.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum KickConfig {
    Simple {
        formalism: String,
        num_slices: usize,
        #[serde(default)]
        coulomb_log: Option<f64>,
    },
    Kinetic {
        num_slices: usize,
        #[serde(default)]
        coulomb_log: Option<f64>,
    },
}

impl KickConfig {
    /// Constructs the disabled element described by this configuration.
    pub(crate) fn build(&self) -> Result<Box<dyn IbsKickElement>, IbsError> {
        match self {
            Self::Simple {
                formalism,
                num_slices,
                coulomb_log,
            } => {
                let mut engine = GrowthRateEngine::new(formalism)?;
                if let Some(value) = coulomb_log {
                    engine = engine.with_coulomb_log(*value)?;
                }
                Ok(Box::new(SimpleKick::with_model(engine, *num_slices)?))
            }
            Self::Kinetic {
                num_slices,
                coulomb_log,
            } => {
                let mut engine = KineticEngine::new();
                if let Some(value) = coulomb_log {
                    engine = engine.with_coulomb_log(*value)?;
                }
                Ok(Box::new(KineticKick::with_model(engine, *num_slices)?))
            }
        }
    }
}
