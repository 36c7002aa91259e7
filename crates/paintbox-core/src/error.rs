//! Error types for paintbox-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Addressing and naming errors
///
/// These only arise while building a sheet. Problems found while evaluating
/// one are cell values ([`CellError`](crate::CellError)), not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Text that is not an A1 address
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Range text whose corners do not parse
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index past the last worksheet row
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column letters past the last worksheet column
    #[error("Column {0} out of bounds (max index: {1})")]
    ColumnOutOfBounds(String, u16),

    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Name that is malformed, reserved or not sheet-qualified
    #[error("Invalid named range: {0}")]
    InvalidName(String),

    #[error("Named range already exists: {0}")]
    DuplicateName(String),
}
