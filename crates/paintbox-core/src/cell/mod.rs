//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value a cell holds or evaluates to
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A range of cells (e.g., "A1:B10")
//! - [`CellKey`] - A sheet-qualified address (e.g., "ROOM!B2")
//! - [`RawValue`] - Seeding input, either a literal or formula text

mod address;
mod raw;
mod value;

pub use address::{CellAddress, CellKey, CellRange, CellRangeIterator, SheetName};
pub use raw::RawValue;
pub use value::{CellError, CellValue, SharedString};
