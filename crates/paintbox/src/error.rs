//! Calculator error types

use thiserror::Error;

/// Result type alias using [`CalculatorError`]
pub type Result<T> = std::result::Result<T, CalculatorError>;

/// Failures that abort a whole calculation
///
/// Problems inside the estimate sheet (a bad lookup, a division by zero) are
/// not errors at this level; they are reported per cell in the estimate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculatorError {
    /// A multi-room estimate was requested for an empty list
    #[error("No rooms supplied")]
    NoRooms,

    /// The calculator options cannot produce a valid estimate sheet
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The estimate sheet itself could not be built
    #[error(transparent)]
    Core(#[from] paintbox_core::Error),
}

impl CalculatorError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        CalculatorError::InvalidConfig(message.into())
    }
}
