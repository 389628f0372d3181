//! Error types for the SPC engines.
//!
//! Every engine validates its inputs eagerly and fails with a specific
//! [`SpcError`] instead of returning NaN or infinity. Callers that render
//! reports are expected to turn an error into a "not computable" state for
//! the affected variable; [`SpcError::kind`] groups the variants for that
//! purpose.

use serde::Serialize;
use thiserror::Error;

/// The main error type for the SPC engines.
///
/// Serializes with a `"error"` tag so that renderers can emit a
/// "not computable" entry alongside successful results.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum SpcError {
    // ============ Data Errors ============
    /// The series is too short for the requested computation.
    #[error("{operation} requires at least {required} observations, got {actual}")]
    InsufficientData {
        /// Name of the computation that was requested.
        operation: &'static str,
        /// Minimum number of observations needed.
        required: usize,
        /// Number of observations supplied.
        actual: usize,
    },

    /// A dispersion estimate is zero (or numerically zero), so a ratio is undefined.
    #[error("{statistic} is zero or numerically zero; the requested ratio is undefined")]
    DegenerateVariance {
        /// Which dispersion estimate collapsed.
        statistic: &'static str,
    },

    /// An observation is NaN or infinite.
    #[error("observation at index {index} is not finite")]
    NonFiniteValue {
        /// Position of the offending observation.
        index: usize,
    },

    /// A Pareto magnitude is negative or not finite.
    #[error("magnitude {value} for category '{category}' must be finite and non-negative")]
    InvalidMagnitude {
        /// Category the magnitude was reported for.
        category: String,
        /// The rejected magnitude.
        value: f64,
    },

    // ============ Specification Errors ============
    /// Specification limits are inconsistent or missing.
    #[error("invalid specification limits: {reason}")]
    InvalidSpecLimits {
        /// Description of what is wrong.
        reason: String,
    },

    // ============ Configuration Errors ============
    /// No control constants are tabulated for this subgroup size.
    #[error("no control constants tabulated for subgroup size {size}")]
    UnsupportedSubgroupSize {
        /// The requested subgroup size.
        size: usize,
    },

    /// An engine parameter is outside its valid range.
    #[error("unsupported configuration for {parameter}: {reason}")]
    UnsupportedConfiguration {
        /// Name of the parameter.
        parameter: &'static str,
        /// Description of the valid range.
        reason: String,
    },
}

/// Coarse error categories used by report renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Series too short for the computation.
    InsufficientData,
    /// Zero or near-zero sigma.
    DegenerateVariance,
    /// USL <= LSL or limits missing.
    InvalidSpecLimits,
    /// Parameters without tabulated constants or outside their range.
    UnsupportedConfiguration,
    /// Non-finite observations or negative magnitudes.
    InvalidInput,
}

impl SpcError {
    /// Returns the coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::DegenerateVariance { .. } => ErrorKind::DegenerateVariance,
            Self::InvalidSpecLimits { .. } => ErrorKind::InvalidSpecLimits,
            Self::UnsupportedSubgroupSize { .. } | Self::UnsupportedConfiguration { .. } => {
                ErrorKind::UnsupportedConfiguration
            }
            Self::NonFiniteValue { .. } | Self::InvalidMagnitude { .. } => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn insufficient(operation: &'static str, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            operation,
            required,
            actual,
        }
    }

    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Result type alias for SPC computations.
pub type Result<T> = std::result::Result<T, SpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = SpcError::insufficient("moving range", 2, 1);
        assert_eq!(
            err.to_string(),
            "moving range requires at least 2 observations, got 1"
        );
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn subgroup_size_maps_to_unsupported_configuration() {
        let err = SpcError::UnsupportedSubgroupSize { size: 9 };
        assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn invalid_input_kinds() {
        assert_eq!(
            SpcError::NonFiniteValue { index: 3 }.kind(),
            ErrorKind::InvalidInput
        );
        let err = SpcError::InvalidMagnitude {
            category: "Leak".into(),
            value: -1.0,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("Leak"));
    }
}
