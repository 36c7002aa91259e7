//! Cell value types

use rust_decimal::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Represents the value a cell holds, or evaluates to
///
/// Numbers are decimals: all sheet arithmetic happens in decimal space.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value
    Number(Decimal),

    /// Text value
    Text(SharedString),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: AsRef<str>>(s: S) -> Self {
        CellValue::Text(SharedString::new(s))
    }

    /// Convert a binary float, yielding `#NUM!` for NaN and infinities
    pub fn from_f64(n: f64) -> Self {
        Decimal::from_f64(n)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Error(CellError::Num))
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// The error kind, if this is an error value
    pub fn as_error(&self) -> Option<CellError> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(true) => Some(Decimal::ONE),
            CellValue::Boolean(false) => Some(Decimal::ZERO),
            _ => None,
        }
    }

    /// Try to get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Number(n) => Some(!n.is_zero()),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Error(_) => "error",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n.normalize()),
            CellValue::Text(s) => write!(f, "{}", s.as_str()),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(Decimal::from(n))
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(Decimal::from(n))
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(Decimal::from(n))
    }
}

impl From<Decimal> for CellValue {
    fn from(n: Decimal) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::text(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Spreadsheet error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellError {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #CALC! - Calculation error
    Calc,
    /// #CIRCULAR! - Cell is part of a reference cycle
    Circular,
    /// #ERROR! - Formula text could not be parsed
    Parse,
}

impl CellError {
    pub const ALL: [CellError; 10] = [
        CellError::Null,
        CellError::Div0,
        CellError::Value,
        CellError::Ref,
        CellError::Name,
        CellError::Num,
        CellError::Na,
        CellError::Calc,
        CellError::Circular,
        CellError::Parse,
    ];

    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
            CellError::Calc => "#CALC!",
            CellError::Circular => "#CIRCULAR!",
            CellError::Parse => "#ERROR!",
        }
    }

    /// Parse an error string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            "#CALC!" => Some(CellError::Calc),
            "#CIRCULAR!" => Some(CellError::Circular),
            "#ERROR!" => Some(CellError::Parse),
            _ => None,
        }
    }

    /// Stable numeric code, used as a type tag when hashing values
    pub fn code(&self) -> u8 {
        match self {
            CellError::Null => 0x00,
            CellError::Div0 => 0x07,
            CellError::Value => 0x0F,
            CellError::Ref => 0x17,
            CellError::Name => 0x1D,
            CellError::Num => 0x24,
            CellError::Na => 0x2A,
            CellError::Calc => 0x2D,
            CellError::Circular => 0x40,
            CellError::Parse => 0x41,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared immutable string
///
/// Text values are cloned freely between the store, the evaluator and the
/// cache; `Arc<str>` keeps those clones cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedString(Arc<str>);

impl SharedString {
    /// Create a new shared string
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    /// Get the string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length of the string in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the string is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString(Arc::from(s))
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::{CellError, CellValue};
    use serde::{Serialize, Serializer};

    impl Serialize for CellError {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(self.as_str())
        }
    }

    /// Values serialize as plain JSON scalars; numbers keep their exact decimal text.
    impl Serialize for CellValue {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                CellValue::Empty => serializer.serialize_none(),
                CellValue::Boolean(b) => serializer.serialize_bool(*b),
                CellValue::Number(n) => Serialize::serialize(&n.normalize(), serializer),
                CellValue::Text(s) => serializer.serialize_str(s.as_str()),
                CellValue::Error(e) => e.serialize(serializer),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_error_strings_round_trip() {
        for e in CellError::ALL {
            assert_eq!(CellError::parse(e.as_str()), Some(e));
        }
        assert_eq!(CellError::parse("#div/0!"), Some(CellError::Div0));
        assert_eq!(CellError::parse("#BOGUS"), None);
    }

    #[test]
    fn test_number_display_is_normalized() {
        let v = CellValue::Number(Decimal::new(6600, 1));
        assert_eq!(v.to_string(), "660");
        assert_eq!(CellValue::Number(Decimal::new(125, 2)).to_string(), "1.25");
    }

    #[test]
    fn test_decimal_equality_ignores_scale() {
        assert_eq!(
            CellValue::Number(Decimal::new(6600, 1)),
            CellValue::from(660)
        );
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(CellValue::from_f64(f64::NAN), CellValue::Error(CellError::Num));
        assert_eq!(CellValue::from_f64(2.5), CellValue::Number(Decimal::new(25, 1)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_values_serialize_as_json_scalars() {
        use serde_json::json;

        let to_json = |v: CellValue| serde_json::to_value(v).unwrap();
        assert_eq!(to_json(CellValue::Number(Decimal::new(6600, 1))), json!("660"));
        assert_eq!(to_json(CellValue::Boolean(true)), json!(true));
        assert_eq!(to_json(CellValue::text("satin")), json!("satin"));
        assert_eq!(to_json(CellValue::Error(CellError::Div0)), json!("#DIV/0!"));
        assert_eq!(to_json(CellValue::Empty), json!(null));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(CellValue::Boolean(true).as_number(), Some(Decimal::ONE));
        assert_eq!(CellValue::from(0).as_bool(), Some(false));
        assert_eq!(CellValue::text("x").as_number(), None);
        assert_eq!(CellValue::text("x").to_string(), "x");
        assert_eq!(CellValue::Empty.type_name(), "empty");
    }
}
