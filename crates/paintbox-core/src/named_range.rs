//! Named range definitions
//!
//! Named ranges give rate-table cells and ranges meaningful names, so estimate
//! formulas read `=B5*DOOR_AREA` rather than `=B5*RATES!$B$2`.
//!
//! # Example
//!
//! ```
//! use paintbox_core::{NamedRange, NameTarget, CellKey};
//!
//! let name = NamedRange::parse("DOOR_AREA", "Rates!$B$2").unwrap();
//! assert_eq!(name.target, NameTarget::Cell(CellKey::parse("RATES!B2").unwrap()));
//! ```

use crate::cell::{CellAddress, CellKey, CellRange, CellValue, SheetName};
use crate::error::{Error, Result};
use ahash::AHashMap;
use rust_decimal::Decimal;
use std::fmt;

/// What a name refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTarget {
    /// A single cell: `Rates!$B$2`
    Cell(CellKey),
    /// A range of cells: `Rates!$A$8:$E$11`
    Range { sheet: SheetName, range: CellRange },
    /// A constant value: `0.0725`
    Constant(CellValue),
}

impl fmt::Display for NameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTarget::Cell(key) => write!(f, "{}", key),
            NameTarget::Range { sheet, range } => write!(f, "{}!{}", sheet, range),
            NameTarget::Constant(CellValue::Text(s)) => write!(f, "\"{}\"", s),
            NameTarget::Constant(v) => write!(f, "{}", v),
        }
    }
}

/// A workbook-scoped named range definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRange {
    /// The name as defined (lookup is case-insensitive)
    pub name: String,
    /// What the name refers to
    pub target: NameTarget,
}

impl NamedRange {
    /// Create a new named range
    pub fn new(name: impl Into<String>, target: NameTarget) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { name, target })
    }

    /// Create a named range from a `refers to` expression
    ///
    /// Accepts `Sheet!A1`, `Sheet!A1:B2`, a numeric constant, `TRUE`/`FALSE`,
    /// or a quoted text constant. A leading `=` is ignored.
    pub fn parse(name: impl Into<String>, refers_to: &str) -> Result<Self> {
        let expr = refers_to.trim();
        let expr = expr.strip_prefix('=').unwrap_or(expr).trim();

        let target = if let Some(text) = expr
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            NameTarget::Constant(CellValue::text(text))
        } else if expr.eq_ignore_ascii_case("TRUE") {
            NameTarget::Constant(CellValue::Boolean(true))
        } else if expr.eq_ignore_ascii_case("FALSE") {
            NameTarget::Constant(CellValue::Boolean(false))
        } else if let Ok(n) = expr.parse::<Decimal>() {
            NameTarget::Constant(CellValue::Number(n))
        } else {
            let (sheet, reference) = expr.rsplit_once('!').ok_or_else(|| {
                Error::InvalidName(format!("'{}' must be sheet-qualified", refers_to))
            })?;
            let sheet = SheetName::new(sheet)?;
            let range = CellRange::parse(reference)?;
            if range.start == range.end {
                NameTarget::Cell(CellKey::new(sheet, range.start))
            } else {
                NameTarget::Range { sheet, range }
            }
        };

        Self::new(name, target)
    }

    /// All cells this name covers (empty for constants)
    pub fn cells(&self) -> Vec<CellKey> {
        match &self.target {
            NameTarget::Cell(key) => vec![key.clone()],
            NameTarget::Range { sheet, range } => range
                .cells()
                .map(|addr: CellAddress| CellKey::new(sheet.clone(), addr))
                .collect(),
            NameTarget::Constant(_) => Vec::new(),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '\\');
    if !first_ok || !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Err(Error::InvalidName(format!("'{}' is not a valid name", name)));
    }
    // A name that reads as a cell address would shadow that cell.
    if CellAddress::parse(name).is_ok() {
        return Err(Error::InvalidName(format!(
            "'{}' conflicts with a cell address",
            name
        )));
    }
    if name.eq_ignore_ascii_case("TRUE") || name.eq_ignore_ascii_case("FALSE") {
        return Err(Error::InvalidName(format!("'{}' is reserved", name)));
    }
    Ok(())
}

/// Collection of named ranges with case-insensitive lookup
#[derive(Debug, Default, Clone)]
pub struct NamedRangeCollection {
    /// Keyed by upper-cased name
    ranges: AHashMap<String, NamedRange>,
}

impl NamedRangeCollection {
    /// Define a new named range
    ///
    /// Returns an error if the name already exists
    pub fn define(&mut self, range: NamedRange) -> Result<()> {
        let key = range.name.to_uppercase();
        if self.ranges.contains_key(&key) {
            return Err(Error::DuplicateName(range.name));
        }
        self.ranges.insert(key, range);
        Ok(())
    }

    /// Get a named range by name
    pub fn get(&self, name: &str) -> Option<&NamedRange> {
        self.ranges.get(&name.to_uppercase())
    }
}
