use thiserror::Error;

/// Failures surfaced by the IBS kick engine.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IbsError {
    /// A configuration value was rejected before any tracking took place.
    #[error("invalid configuration for `{parameter}`: {reason}")]
    InvalidConfiguration {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Human readable description of the problem.
        reason: String,
    },
    /// Coefficient recomputation could not produce finite results.
    #[error("numeric failure in {stage}: {reason}")]
    NumericFailure {
        /// Computation stage that failed.
        stage: &'static str,
        /// Human readable description of the problem.
        reason: String,
    },
    /// The requested operation is not supported by the element.
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation {
        /// Description of the refused operation.
        operation: String,
    },
}

impl IbsError {
    /// Builds an [`IbsError::InvalidConfiguration`] for the named parameter.
    #[must_use]
    pub fn invalid_configuration(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            parameter,
            reason: reason.into(),
        }
    }

    /// Builds an [`IbsError::NumericFailure`] for the named stage.
    #[must_use]
    pub fn numeric_failure(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::NumericFailure {
            stage,
            reason: reason.into(),
        }
    }
}
