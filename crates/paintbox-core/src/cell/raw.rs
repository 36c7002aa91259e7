//! Raw seeding input

use super::value::{CellError, CellValue};
use rust_decimal::Decimal;
use std::sync::Arc;

/// A value handed to the worksheet store by a caller
///
/// Text that begins with `=` is formula text; everything else is a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Literal value
    Value(CellValue),
    /// Formula source text (with or without the leading `=`)
    Formula(Arc<str>),
}

impl RawValue {
    /// Create a formula input
    pub fn formula<S: AsRef<str>>(text: S) -> Self {
        RawValue::Formula(Arc::from(text.as_ref()))
    }

    /// Interpret user-typed text the way a spreadsheet cell does:
    /// `=...` is a formula, `TRUE`/`FALSE` are booleans, decimal text is a number
    /// and error literals such as `#N/A` are errors.
    pub fn from_input(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('=') {
            return RawValue::formula(trimmed);
        }
        if trimmed.is_empty() {
            return RawValue::Value(CellValue::Empty);
        }
        if trimmed.eq_ignore_ascii_case("TRUE") {
            return RawValue::Value(CellValue::Boolean(true));
        }
        if trimmed.eq_ignore_ascii_case("FALSE") {
            return RawValue::Value(CellValue::Boolean(false));
        }
        if let Ok(n) = trimmed.parse::<Decimal>() {
            return RawValue::Value(CellValue::Number(n));
        }
        if let Some(err) = CellError::parse(trimmed) {
            return RawValue::Value(CellValue::Error(err));
        }
        RawValue::Value(CellValue::text(text))
    }
}

impl Default for RawValue {
    fn default() -> Self {
        RawValue::Value(CellValue::Empty)
    }
}

impl From<CellValue> for RawValue {
    fn from(v: CellValue) -> Self {
        RawValue::Value(v)
    }
}

impl From<Decimal> for RawValue {
    fn from(n: Decimal) -> Self {
        RawValue::Value(CellValue::Number(n))
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Value(CellValue::from(n))
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Value(CellValue::from(n))
    }
}

impl From<u32> for RawValue {
    fn from(n: u32) -> Self {
        RawValue::Value(CellValue::from(n))
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Value(CellValue::Boolean(b))
    }
}

/// String literals follow the `=` convention: `"=A1+1"` is a formula.
impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        if s.trim_start().starts_with('=') {
            RawValue::formula(s.trim())
        } else {
            RawValue::Value(CellValue::text(s))
        }
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_detects_formula() {
        assert_eq!(RawValue::from("=A1+B1"), RawValue::formula("=A1+B1"));
        assert_eq!(RawValue::from("  =A1"), RawValue::formula("=A1"));
        assert_eq!(RawValue::from("eggshell"), RawValue::Value(CellValue::text("eggshell")));
    }

    #[test]
    fn test_from_input() {
        assert_eq!(RawValue::from_input("100"), RawValue::from(100));
        assert_eq!(
            RawValue::from_input("1.25"),
            RawValue::Value(CellValue::Number(Decimal::new(125, 2)))
        );
        assert_eq!(RawValue::from_input("true"), RawValue::from(true));
        assert_eq!(RawValue::from_input(""), RawValue::default());
        assert_eq!(RawValue::from_input("=SUM(A1:A3)"), RawValue::formula("=SUM(A1:A3)"));
        assert_eq!(RawValue::from_input("satin"), RawValue::Value(CellValue::text("satin")));
        assert_eq!(RawValue::from_input("#n/a"), RawValue::Value(CellValue::Error(CellError::Na)));
        assert_eq!(RawValue::from_input("#N/A?"), RawValue::Value(CellValue::text("#N/A?")));
    }
}
