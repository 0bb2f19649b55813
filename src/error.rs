//! Error taxonomy for the processing core
//!
//! Only configuration mistakes and malformed inputs abort an operation.
//! Data-quality conditions (bins below the minimum sample count, near-zero
//! denominators) are encoded in the outputs as blanked bins or NaN/±inf.

use thiserror::Error;

/// Errors that abort a processing operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EddyError {
    /// Invalid parameters: bin width, rotation stage count, limits, ...
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Input that the operation cannot work on (unknown channel, misaligned
    /// index, empty channel tuple, ...)
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, EddyError>;

impl EddyError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn input(msg: impl Into<String>) -> Self {
        Self::UnsupportedInput(msg.into())
    }
}
