//! # paintbox-core
//!
//! Core data structures for the paintbox estimate engine.
//!
//! This crate provides the fundamental types used throughout paintbox:
//! - [`CellValue`] - Decimal numbers, text, booleans, errors and empties
//! - [`CellAddress`], [`CellRange`] and [`CellKey`] - Cell addressing and ranges
//! - [`Workbook`], [`Worksheet`] - The per-request worksheet data store
//! - [`NamedRange`] - Workbook-scoped names for cells, ranges and constants
//!
//! ## Example
//!
//! ```rust
//! use paintbox_core::{CellKey, CellValue, RawValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let changed = workbook.set_worksheet_data(vec![
//!     (CellKey::parse("Room!B2").unwrap(), RawValue::from(12)),
//!     (CellKey::parse("Room!D2").unwrap(), RawValue::from("=2*(B2+B3)")),
//! ]);
//! assert_eq!(changed.len(), 2);
//! assert_eq!(
//!     workbook.literal(&CellKey::parse("Room!B2").unwrap()),
//!     CellValue::from(12)
//! );
//! ```

pub mod cell;
pub mod error;
pub mod named_range;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{
    CellAddress, CellError, CellKey, CellRange, CellValue, RawValue, SharedString, SheetName,
};
pub use error::{Error, Result};
pub use named_range::{NameTarget, NamedRange, NamedRangeCollection};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
