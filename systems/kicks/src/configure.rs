//! Line-level configuration entry point for kick elements.

use std::num::NonZeroU64;

use ibs_kick_beam::LatticeOptics;
use ibs_kick_core::IbsError;
use serde::{Deserialize, Serialize};

use crate::IbsKickElement;

/// Settings applied by [`configure_intrabeam_scattering`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IbsConfiguration {
    /// Recomputation period of the coefficients, in turns. Must be positive.
    pub update_every: i64,
    /// Multiplier applied to every kick. Zero keeps the element disabled.
    #[serde(default = "default_scale_strength")]
    pub scale_strength: f64,
}

impl IbsConfiguration {
    /// Configuration recomputing every `update_every` turns at full strength.
    #[must_use]
    pub const fn new(update_every: i64) -> Self {
        Self {
            update_every,
            scale_strength: 1.0,
        }
    }

    /// Returns the configuration with the provided scale strength.
    #[must_use]
    pub const fn with_scale_strength(mut self, scale_strength: f64) -> Self {
        self.scale_strength = scale_strength;
        self
    }
}

const fn default_scale_strength() -> f64 {
    1.0
}

/// Validates `configuration`, attaches `optics` to `element` and enables it.
///
/// Fails with [`IbsError::InvalidConfiguration`] for a non-positive
/// `update_every`, a non-finite scale strength, or an attempt to change the
/// recomputation period of an element configured before.
pub fn configure_intrabeam_scattering<E>(
    element: &mut E,
    optics: LatticeOptics,
    configuration: &IbsConfiguration,
) -> Result<(), IbsError>
where
    E: IbsKickElement + ?Sized,
{
    let update_every = u64::try_from(configuration.update_every)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or_else(|| {
            IbsError::invalid_configuration(
                "update_every",
                format!(
                    "recomputation period must be positive, got {}",
                    configuration.update_every
                ),
            )
        })?;
    if !configuration.scale_strength.is_finite() {
        return Err(IbsError::invalid_configuration(
            "scale_strength",
            format!(
                "scale strength must be finite, got {}",
                configuration.scale_strength
            ),
        ));
    }
    element.attach(optics, update_every, configuration.scale_strength)?;
    log::info!(
        "configured {} to recompute every {update_every} turns with scale strength {}",
        element.name(),
        configuration.scale_strength
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::IbsConfiguration;

    #[test]
    fn scale_strength_defaults_to_one() {
        let configuration: IbsConfiguration =
            serde_json::from_str(r#"{"update_every": 25}"#).expect("configuration");
        assert_eq!(configuration, IbsConfiguration::new(25));
        assert_eq!(
            IbsConfiguration::new(25).with_scale_strength(0.5).scale_strength,
            0.5
        );
    }
}
