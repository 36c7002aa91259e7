//! Formula error types

use paintbox_core::CellError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
///
/// None of these cross the evaluation boundary as a failure of the whole
/// request: each maps to the [`CellError`] value that flows through the sheet
/// (see [`FormulaError::cell_error`]) and is kept as the per-cell diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// Formula text failed to parse
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Unknown named reference
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Cell is part of a reference cycle
    #[error("Circular reference involving {0}")]
    CircularReference(String),

    /// Reference to a nonexistent sheet or out-of-bounds cell
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Argument or operand cannot be coerced to the required type
    #[error("Type mismatch: {0}")]
    Type(String),

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// The formula produced an error value of its own
    #[error("Formula evaluated to {0}")]
    ErrorValue(CellError),

    /// An error value flowed in from a referenced cell
    #[error("{error} propagated from {cell}")]
    Propagated { cell: String, error: CellError },
}

impl FormulaError {
    /// Shorthand for a parse error
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        FormulaError::Parse {
            position,
            message: message.into(),
        }
    }

    /// The error value a cell holds when this error occurs
    pub fn cell_error(&self) -> CellError {
        match self {
            FormulaError::Parse { .. } => CellError::Parse,
            FormulaError::UnknownFunction(_) | FormulaError::UnknownName(_) => CellError::Name,
            FormulaError::ArgumentCount { .. } | FormulaError::Type(_) => CellError::Value,
            FormulaError::CircularReference(_) => CellError::Circular,
            FormulaError::InvalidReference(_) => CellError::Ref,
            FormulaError::DivisionByZero => CellError::Div0,
            FormulaError::ErrorValue(e) | FormulaError::Propagated { error: e, .. } => *e,
        }
    }
}
