//! Formula Abstract Syntax Tree types
//!
//! `Display` on [`FormulaExpr`] re-serializes a tree to canonical formula text
//! (leading `=`, upper-case function names, minimal parentheses). Parsing that
//! text yields a tree equal to the original.

use crate::error::FormulaResult;
use paintbox_core::{CellAddress, CellError, CellRange, SheetName};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal (never negative: `-1` parses as negation of `1`)
    Number(Decimal),
    /// Text literal
    Text(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal
    Error(CellError),

    // === References ===
    /// Single cell reference
    CellRef(CellReference),
    /// Range reference
    RangeRef(RangeReference),
    /// Named range or defined name
    NameRef(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function {
        name: String,
        args: Vec<FormulaExpr>,
    },

    // === Array constant ===
    Array(Vec<Vec<FormulaExpr>>),
}

/// Absolute (`$`) markers on a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Anchors {
    pub col: bool,
    pub row: bool,
}

/// Cell reference with optional sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellReference {
    pub sheet: Option<SheetName>,
    pub address: CellAddress,
    pub anchors: Anchors,
}

/// Range reference with optional sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeReference {
    pub sheet: Option<SheetName>,
    pub range: CellRange,
    pub start_anchors: Anchors,
    pub end_anchors: Anchors,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

impl BinaryOperator {
    /// Operator symbol as written in formulas
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => 1,
            BinaryOperator::Concat => 2,
            BinaryOperator::Add | BinaryOperator::Subtract => 3,
            BinaryOperator::Multiply | BinaryOperator::Divide => 4,
            BinaryOperator::Power => 5,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

const PREC_UNARY: u8 = 6;
const PREC_PRIMARY: u8 = 7;

impl FormulaExpr {
    fn precedence(&self) -> u8 {
        match self {
            FormulaExpr::BinaryOp { op, .. } => op.precedence(),
            FormulaExpr::UnaryOp { .. } => PREC_UNARY,
            _ => PREC_PRIMARY,
        }
    }

    /// Whether the tree contains a call to the named function
    pub fn calls(&self, function: &str) -> bool {
        match self {
            FormulaExpr::Function { name, args } => {
                name.eq_ignore_ascii_case(function) || args.iter().any(|a| a.calls(function))
            }
            FormulaExpr::BinaryOp { left, right, .. } => {
                left.calls(function) || right.calls(function)
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.calls(function),
            FormulaExpr::Array(rows) => rows.iter().flatten().any(|e| e.calls(function)),
            _ => false,
        }
    }

    /// Write this expression without the leading `=`
    fn write_body(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaExpr::Number(n) => write!(f, "{}", n),
            FormulaExpr::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            FormulaExpr::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            FormulaExpr::Error(e) => write!(f, "{}", e),
            FormulaExpr::CellRef(r) => write!(f, "{}", r),
            FormulaExpr::RangeRef(r) => write!(f, "{}", r),
            FormulaExpr::NameRef(name) => write!(f, "{}", name),
            FormulaExpr::BinaryOp { op, left, right } => {
                let prec = op.precedence();
                // All binary operators are left-associative
                write_operand(f, left, prec)?;
                write!(f, "{}", op.symbol())?;
                write_operand(f, right, prec + 1)
            }
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand,
            } => {
                write!(f, "-")?;
                write_operand(f, operand, PREC_UNARY)
            }
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand,
            } => {
                let bare = matches!(
                    **operand,
                    FormulaExpr::UnaryOp {
                        op: UnaryOperator::Percent,
                        ..
                    }
                ) || operand.precedence() == PREC_PRIMARY;
                write_operand(f, operand, if bare { 0 } else { PREC_PRIMARY + 1 })?;
                write!(f, "%")
            }
            FormulaExpr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    arg.write_body(f)?;
                }
                write!(f, ")")
            }
            FormulaExpr::Array(rows) => {
                write!(f, "{{")?;
                for (r, row) in rows.iter().enumerate() {
                    if r > 0 {
                        write!(f, ";")?;
                    }
                    for (c, item) in row.iter().enumerate() {
                        if c > 0 {
                            write!(f, ",")?;
                        }
                        item.write_body(f)?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &FormulaExpr, min_prec: u8) -> fmt::Result {
    if expr.precedence() < min_prec {
        write!(f, "(")?;
        expr.write_body(f)?;
        write!(f, ")")
    } else {
        expr.write_body(f)
    }
}

impl fmt::Display for FormulaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "=")?;
        self.write_body(f)
    }
}

fn write_address(f: &mut fmt::Formatter<'_>, addr: CellAddress, anchors: Anchors) -> fmt::Result {
    if anchors.col {
        write!(f, "$")?;
    }
    write!(f, "{}", CellAddress::column_to_letters(addr.col))?;
    if anchors.row {
        write!(f, "$")?;
    }
    write!(f, "{}", addr.row + 1)
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{}!", sheet)?;
        }
        write_address(f, self.address, self.anchors)
    }
}

impl fmt::Display for RangeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{}!", sheet)?;
        }
        write_address(f, self.range.start, self.start_anchors)?;
        write!(f, ":")?;
        write_address(f, self.range.end, self.end_anchors)
    }
}

/// A parsed formula: source text plus its AST
///
/// Immutable once parsed; a cell whose text changes gets a new `Formula`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    text: Arc<str>,
    ast: FormulaExpr,
}

impl Formula {
    /// Parse formula text (the leading `=` is optional)
    pub fn parse(text: impl Into<Arc<str>>) -> FormulaResult<Self> {
        let text = text.into();
        let ast = crate::parser::parse_formula(&text)?;
        Ok(Self { text, ast })
    }

    /// The source text as given
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The parsed tree
    pub fn ast(&self) -> &FormulaExpr {
        &self.ast
    }

    /// Canonical text of the parsed tree
    pub fn canonical(&self) -> String {
        self.ast.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn canonical(text: &str) -> String {
        parse_formula(text).unwrap().to_string()
    }

    #[test]
    fn test_display_minimal_parentheses() {
        assert_eq!(canonical("=1+2*3"), "=1+2*3");
        assert_eq!(canonical("=(1+2)*3"), "=(1+2)*3");
        assert_eq!(canonical("=1-(2-3)"), "=1-(2-3)");
        assert_eq!(canonical("=(1-2)-3"), "=1-2-3");
        assert_eq!(canonical("=2^3^2"), "=2^3^2");
        assert_eq!(canonical("=(2^3)^2"), "=2^3^2");
        assert_eq!(canonical("=2^(3^2)"), "=2^(3^2)");
        assert_eq!(canonical("=-(1+2)"), "=-(1+2)");
        assert_eq!(canonical("=(A1>1)&\"x\""), "=(A1>1)&\"x\"");
    }

    #[test]
    fn test_display_references() {
        assert_eq!(canonical("=rates!$b$4*b2"), "=RATES!$B$4*B2");
        assert_eq!(canonical("='Room Data'!A1:A3"), "='ROOM DATA'!A1:A3");
        assert_eq!(canonical("='O''Brien'!A1+1"), "='O''BRIEN'!A1+1");
        assert_eq!(canonical(&canonical("='O''Brien'!A1+1")), "='O''BRIEN'!A1+1");
        assert_eq!(canonical("=sum(a1:b2)"), "=SUM(A1:B2)");
        assert_eq!(canonical("=Door_Area*2"), "=Door_Area*2");
    }

    #[test]
    fn test_display_literals() {
        assert_eq!(canonical("=\"say \"\"hi\"\"\""), "=\"say \"\"hi\"\"\"");
        assert_eq!(canonical("={1,2;3,4}"), "={1,2;3,4}");
        assert_eq!(canonical("=50%"), "=50%");
        assert_eq!(canonical("=-5%"), "=-5%");
        assert_eq!(canonical("=#N/A"), "=#N/A");
        assert_eq!(canonical("=true"), "=TRUE");
    }

    #[test]
    fn test_percent_of_negation_keeps_parentheses() {
        let expr = FormulaExpr::UnaryOp {
            op: UnaryOperator::Percent,
            operand: Box::new(FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(FormulaExpr::Number(Decimal::from(5))),
            }),
        };
        assert_eq!(expr.to_string(), "=(-5)%");
        assert_eq!(parse_formula(&expr.to_string()).unwrap(), expr);
    }

    #[test]
    fn test_formula_keeps_text() {
        let formula = Formula::parse("=if(A1>500, A1*1.1, A1)").unwrap();
        assert_eq!(formula.text(), "=if(A1>500, A1*1.1, A1)");
        assert_eq!(formula.canonical(), "=IF(A1>500,A1*1.1,A1)");
        assert!(formula.ast().calls("IF"));
        assert!(!formula.ast().calls("SUM"));
    }
}
