//! Worksheet type

use ahash::AHashMap;

use crate::cell::{CellAddress, CellValue, RawValue, SheetName};

/// A worksheet (single sheet in a workbook)
///
/// Sparse storage: only non-empty cells have an entry.
#[derive(Debug, Clone)]
pub struct Worksheet {
    /// Sheet name
    name: SheetName,
    /// Cell contents, literal or formula text
    cells: AHashMap<CellAddress, RawValue>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new(name: SheetName) -> Self {
        Self {
            name,
            cells: AHashMap::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &SheetName {
        &self.name
    }

    /// Literal value of a cell; formula cells and missing cells read as `None`
    pub fn literal_at(&self, addr: CellAddress) -> Option<&CellValue> {
        match self.cells.get(&addr) {
            Some(RawValue::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Formula text of a cell, if it holds one
    pub fn formula_at(&self, addr: CellAddress) -> Option<&str> {
        match self.cells.get(&addr) {
            Some(RawValue::Formula(text)) => Some(text),
            _ => None,
        }
    }

    /// Set a cell's content, returning whether it changed
    ///
    /// Setting `Empty` removes the cell.
    pub fn set_cell_at(&mut self, addr: CellAddress, value: RawValue) -> bool {
        if matches!(value, RawValue::Value(CellValue::Empty)) {
            return self.cells.remove(&addr).is_some();
        }
        match self.cells.get(&addr) {
            Some(existing) if *existing == value => false,
            _ => {
                self.cells.insert(addr, value);
                true
            }
        }
    }
}
