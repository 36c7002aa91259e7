//! Workbook type - the per-request worksheet data store

use crate::cell::{CellKey, CellValue, RawValue, SheetName};
use crate::error::Result;
use crate::named_range::{NamedRange, NamedRangeCollection};
use crate::worksheet::Worksheet;

/// A workbook: worksheets plus workbook-scoped names
///
/// Each calculation request owns its own workbook, so nothing here is shared
/// between concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    /// Worksheets in creation order
    worksheets: Vec<Worksheet>,
    /// Named ranges (defined names)
    named_ranges: NamedRangeCollection,
}

impl Workbook {
    /// Create an empty workbook with no worksheets
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a worksheet by name
    pub fn worksheet(&self, name: &SheetName) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    /// Check whether a sheet exists
    pub fn has_sheet(&self, name: &SheetName) -> bool {
        self.worksheet(name).is_some()
    }

    fn ensure_worksheet(&mut self, name: SheetName) -> &mut Worksheet {
        let index = match self.worksheets.iter().position(|ws| *ws.name() == name) {
            Some(index) => index,
            None => {
                self.worksheets.push(Worksheet::new(name));
                self.worksheets.len() - 1
            }
        };
        &mut self.worksheets[index]
    }

    // ==================== Cells ====================

    /// Literal value of a cell (`Empty` for missing, and for formula cells)
    pub fn literal(&self, key: &CellKey) -> CellValue {
        self.worksheet(&key.sheet)
            .and_then(|ws| ws.literal_at(key.address))
            .cloned()
            .unwrap_or_default()
    }

    /// Formula text stored at a cell
    pub fn formula(&self, key: &CellKey) -> Option<&str> {
        self.worksheet(&key.sheet)?.formula_at(key.address)
    }

    /// Set one cell, creating its sheet on demand. Returns whether it changed.
    pub fn set(&mut self, key: &CellKey, value: impl Into<RawValue>) -> bool {
        self.ensure_worksheet(key.sheet.clone())
            .set_cell_at(key.address, value.into())
    }

    /// Bulk-load cell contents
    ///
    /// Only the given cells are overwritten; every other cell keeps its
    /// content. Returns the keys whose content actually changed, in input
    /// order.
    pub fn set_worksheet_data<I, V>(&mut self, entries: I) -> Vec<CellKey>
    where
        I: IntoIterator<Item = (CellKey, V)>,
        V: Into<RawValue>,
    {
        let mut changed = Vec::new();
        for (key, value) in entries {
            if self.set(&key, value) {
                changed.push(key);
            }
        }
        changed
    }

    // ==================== Named Ranges ====================

    /// Define a new workbook-scoped named range
    ///
    /// # Example
    /// ```
    /// use paintbox_core::Workbook;
    ///
    /// let mut wb = Workbook::new();
    /// wb.define_name("LABOR_RATE", "Rates!$B$4").unwrap();
    /// assert!(wb.named_range("labor_rate").is_some());
    /// ```
    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<()> {
        let range = NamedRange::parse(name, refers_to)?;
        self.named_ranges.define(range)
    }

    /// Get a named range by name (case-insensitive)
    pub fn named_range(&self, name: &str) -> Option<&NamedRange> {
        self.named_ranges.get(name)
    }
}
