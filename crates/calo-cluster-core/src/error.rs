//! Error types for clustering and loss operations.
//!
//! # Error Categories
//!
//! | Category | Variants | Recovery Strategy |
//! |----------|----------|-------------------|
//! | Caller contract | InvalidInput, LengthMismatch, DimensionMismatch | Fix input data |
//! | Parameters | InvalidParameter, ConfigError | Fix configuration |
//! | Infrastructure | TensorError | Check device / tensor shapes |
//!
//! Division-by-zero boundary cases are never surfaced as errors: they are
//! absorbed with stabilizing epsilons where they occur.

use thiserror::Error;

/// Errors that can occur during clustering or loss computation.
#[derive(Debug, Error)]
pub enum CaloError {
    /// Input violates the caller contract (missing labels, reserved labels, non-finite values).
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What is wrong with the input
        message: String,
    },

    /// Two parallel per-hit arrays disagree in length.
    #[error("Length mismatch for {what}: expected {expected}, actual {actual}")]
    LengthMismatch {
        /// Name of the offending array
        what: &'static str,
        /// Number of hits in the embedding
        expected: usize,
        /// Length of the offending array
        actual: usize,
    },

    /// Vector or tensor dimension does not match the expected one.
    #[error("Dimension mismatch: expected {expected}, actual {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// Algorithm parameter out of range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of what's wrong with the parameter
        message: String,
    },

    /// Configuration could not be read, parsed or validated.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description including the config section
        message: String,
    },

    /// Tensor backend failure.
    #[error("Tensor operation failed: {message}")]
    TensorError {
        /// Backend error message
        message: String,
    },
}

impl CaloError {
    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a LengthMismatch error.
    pub fn length_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            what,
            expected,
            actual,
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a ConfigError.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// True for every variant caused by a caller contract violation.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::LengthMismatch { .. }
                | Self::DimensionMismatch { .. }
                | Self::ConfigError { .. }
        )
    }
}

impl From<candle_core::Error> for CaloError {
    fn from(e: candle_core::Error) -> Self {
        Self::TensorError {
            message: e.to_string(),
        }
    }
}

/// Result type for clustering and loss operations.
pub type CaloResult<T> = Result<T, CaloError>;
