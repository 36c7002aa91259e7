//! Formula evaluator
//!
//! Evaluates formula ASTs to produce values. Errors never escape as failures:
//! every problem becomes an error value that flows into dependent formulas,
//! and its cause is kept on the [`EvaluationContext`] as a diagnostic.
//! Causes noted inside a sub-expression that still produced a value (an
//! error caught by `IFERROR`, say) are dropped again.
//!
//! Coercion rules for operators:
//! - arithmetic (`+ - * / ^`, unary `-`, `%`) accepts numbers, booleans
//!   (1/0), empty cells (0) and numeric text; any other text is `#VALUE!`
//! - `&` converts both sides to text (numbers print without trailing zeros)
//! - comparisons order numbers < text < booleans; text compares
//!   case-insensitively; empty compares as 0 (or "" against text)
//! - an error operand wins, left before right

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{FunctionRegistry, Implementation};
use paintbox_core::{
    CellError, CellKey, CellRange, CellValue, NameTarget, NamedRange, SheetName, Workbook,
};
use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

pub(crate) fn function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaValue {
    Number(Decimal),
    Text(String),
    Boolean(bool),
    Error(CellError),
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    /// Convert to number, if possible (arithmetic coercion)
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(Decimal::ONE),
            FormulaValue::Boolean(false) => Some(Decimal::ZERO),
            FormulaValue::Text(s) => parse_numeric_text(s),
            FormulaValue::Empty => Some(Decimal::ZERO),
            _ => None,
        }
    }

    /// Force conversion to number for arithmetic
    pub fn to_number(&self) -> FormulaResult<Decimal> {
        match self {
            FormulaValue::Error(e) => Err(FormulaError::ErrorValue(*e)),
            FormulaValue::Array(_) => Err(FormulaError::Type(
                "Expected a single value, got a range".into(),
            )),
            v => v.as_number().ok_or_else(|| {
                FormulaError::Type(format!("Cannot convert {} to number", v.describe()))
            }),
        }
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(!n.is_zero()),
            FormulaValue::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            FormulaValue::Empty => Some(false),
            _ => None,
        }
    }

    /// Force conversion to boolean for conditions
    pub fn to_bool(&self) -> FormulaResult<bool> {
        match self {
            FormulaValue::Error(e) => Err(FormulaError::ErrorValue(*e)),
            v => v.as_bool().ok_or_else(|| {
                FormulaError::Type(format!("Cannot convert {} to a logical", v.describe()))
            }),
        }
    }

    /// Convert to text
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => n.normalize().to_string(),
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.to_string(),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            FormulaValue::Number(n) => format!("number {}", n.normalize()),
            FormulaValue::Text(s) => format!("text \"{}\"", s),
            FormulaValue::Boolean(b) => format!("logical {}", if *b { "TRUE" } else { "FALSE" }),
            FormulaValue::Error(e) => format!("error {}", e),
            FormulaValue::Array(_) => "range".to_string(),
            FormulaValue::Empty => "empty cell".to_string(),
        }
    }
}

/// Numeric text as typed in a cell: optional sign, digits, optional exponent
pub(crate) fn parse_numeric_text(s: &str) -> Option<Decimal> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Some(pct) = t.strip_suffix('%') {
        return parse_numeric_text(pct).and_then(|n| n.checked_div(Decimal::ONE_HUNDRED));
    }
    Decimal::from_str(t)
        .ok()
        .or_else(|| Decimal::from_scientific(t).ok())
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::Text(s) => FormulaValue::Text(s.as_str().to_string()),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
        }
    }
}

impl From<FormulaValue> for CellValue {
    /// A 1x1 array collapses to its element; larger arrays cannot live in one cell.
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::Text(s) => CellValue::text(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(mut rows) => {
                if rows.len() == 1 && rows[0].len() == 1 {
                    rows.remove(0).remove(0).into()
                } else {
                    CellValue::Error(CellError::Value)
                }
            }
        }
    }
}

impl From<CellError> for FormulaValue {
    fn from(e: CellError) -> Self {
        FormulaValue::Error(e)
    }
}

/// Read access to cell values and names during evaluation
pub trait CellSource {
    /// Current value of a cell (computed value for formula cells)
    fn cell_value(&self, key: &CellKey) -> CellValue;
    /// Whether the sheet exists
    fn has_sheet(&self, sheet: &SheetName) -> bool;
    /// Look up a workbook-scoped name
    fn named_range(&self, name: &str) -> Option<&NamedRange>;
}

/// A bare workbook exposes its literal values; formula cells read as empty.
impl CellSource for Workbook {
    fn cell_value(&self, key: &CellKey) -> CellValue {
        self.literal(key)
    }

    fn has_sheet(&self, sheet: &SheetName) -> bool {
        Workbook::has_sheet(self, sheet)
    }

    fn named_range(&self, name: &str) -> Option<&NamedRange> {
        Workbook::named_range(self, name)
    }
}

struct NoCells;

impl CellSource for NoCells {
    fn cell_value(&self, _key: &CellKey) -> CellValue {
        CellValue::Empty
    }

    fn has_sheet(&self, _sheet: &SheetName) -> bool {
        true
    }

    fn named_range(&self, _name: &str) -> Option<&NamedRange> {
        None
    }
}

static NO_CELLS: NoCells = NoCells;

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    /// Where cell values and names come from
    source: &'a dyn CellSource,
    /// Sheet that unqualified references resolve against
    current_sheet: SheetName,
    /// Problems noted on the paths that produced error values, oldest first
    issues: RefCell<Vec<FormulaError>>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(source: &'a dyn CellSource, current_sheet: SheetName) -> Self {
        Self {
            source,
            current_sheet,
            issues: RefCell::new(Vec::new()),
        }
    }

    /// Create a context without any cells (for testing)
    pub fn simple() -> EvaluationContext<'static> {
        EvaluationContext::new(&NO_CELLS, SheetName::default())
    }

    /// The sheet unqualified references resolve against
    pub fn current_sheet(&self) -> &SheetName {
        &self.current_sheet
    }

    /// Record a problem
    pub fn note(&self, error: FormulaError) {
        self.issues.borrow_mut().push(error);
    }

    /// Take the earliest problem that still explains the result, if any
    pub fn take_issue(&self) -> Option<FormulaError> {
        std::mem::take(&mut *self.issues.borrow_mut()).into_iter().next()
    }

    /// Position in the issue log, for [`EvaluationContext::discard_since`]
    pub(crate) fn mark(&self) -> usize {
        self.issues.borrow().len()
    }

    /// Forget problems noted after `mark`; their error was handled
    pub(crate) fn discard_since(&self, mark: usize) {
        self.issues.borrow_mut().truncate(mark);
    }

    fn resolve_sheet(&self, sheet: Option<&SheetName>) -> FormulaResult<SheetName> {
        match sheet {
            Some(name) if self.source.has_sheet(name) => Ok(name.clone()),
            Some(name) => Err(FormulaError::InvalidReference(format!(
                "Sheet {} does not exist",
                name
            ))),
            None => Ok(self.current_sheet.clone()),
        }
    }

    fn read_cell(&self, key: &CellKey) -> FormulaValue {
        let value: FormulaValue = self.source.cell_value(key).into();
        if let FormulaValue::Error(error) = value {
            self.note(FormulaError::Propagated {
                cell: key.to_string(),
                error,
            });
        }
        value
    }

    /// Get a cell value
    pub fn get_cell_value(
        &self,
        sheet: Option<&SheetName>,
        address: paintbox_core::CellAddress,
    ) -> FormulaValue {
        match self.resolve_sheet(sheet) {
            Ok(sheet) => self.read_cell(&CellKey::new(sheet, address)),
            Err(e) => self.fail(e),
        }
    }

    /// Get a range of cell values as an array (row-major)
    pub fn get_range_values(&self, sheet: Option<&SheetName>, range: CellRange) -> FormulaValue {
        let sheet = match self.resolve_sheet(sheet) {
            Ok(sheet) => sheet,
            Err(e) => return self.fail(e),
        };

        let rows = (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| {
                        let addr = paintbox_core::CellAddress::new(row, col);
                        self.read_cell(&CellKey::new(sheet.clone(), addr))
                    })
                    .collect()
            })
            .collect();

        FormulaValue::Array(rows)
    }

    /// Resolve a named range to its value
    pub fn resolve_named_range(&self, name: &str) -> FormulaValue {
        let target = match self.source.named_range(name) {
            Some(named) => named.target.clone(),
            None => return self.fail(FormulaError::UnknownName(name.to_string())),
        };

        match target {
            NameTarget::Cell(key) => self.get_cell_value(Some(&key.sheet), key.address),
            NameTarget::Range { sheet, range } => self.get_range_values(Some(&sheet), range),
            NameTarget::Constant(value) => value.into(),
        }
    }

    /// Record an error and return its value
    pub fn fail(&self, error: FormulaError) -> FormulaValue {
        let value = FormulaValue::Error(error.cell_error());
        self.note(error);
        value
    }

    /// Turn a function result into a value, recording any error
    pub fn settle(&self, result: FormulaResult<FormulaValue>) -> FormulaValue {
        result.unwrap_or_else(|e| self.fail(e))
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaValue {
    let mark = ctx.mark();
    let value = evaluate_expr(expr, ctx);
    if !carries_error(&value) {
        ctx.discard_since(mark);
    }
    value
}

fn carries_error(value: &FormulaValue) -> bool {
    match value {
        FormulaValue::Error(_) => true,
        FormulaValue::Array(rows) => rows.iter().flatten().any(FormulaValue::is_error),
        _ => false,
    }
}

fn evaluate_expr(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaValue {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => FormulaValue::Number(*n),
        FormulaExpr::Text(s) => FormulaValue::Text(s.clone()),
        FormulaExpr::Boolean(b) => FormulaValue::Boolean(*b),
        FormulaExpr::Error(e) => FormulaValue::Error(*e),

        // === References ===
        FormulaExpr::CellRef(cell_ref) => {
            ctx.get_cell_value(cell_ref.sheet.as_ref(), cell_ref.address)
        }

        FormulaExpr::RangeRef(range_ref) => {
            ctx.get_range_values(range_ref.sheet.as_ref(), range_ref.range)
        }

        FormulaExpr::NameRef(name) => ctx.resolve_named_range(name),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => {
            let left = evaluate(left, ctx);
            let right = evaluate(right, ctx);
            ctx.settle(evaluate_binary_op(*op, &left, &right))
        }

        FormulaExpr::UnaryOp { op, operand } => {
            let operand = evaluate(operand, ctx);
            ctx.settle(evaluate_unary_op(*op, &operand))
        }

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),

        // === Arrays ===
        FormulaExpr::Array(rows) => FormulaValue::Array(
            rows.iter()
                .map(|row| row.iter().map(|item| evaluate(item, ctx)).collect())
                .collect(),
        ),
    }
}

fn numeric_result(result: Option<Decimal>) -> FormulaResult<FormulaValue> {
    result
        .map(FormulaValue::Number)
        .ok_or(FormulaError::ErrorValue(CellError::Num))
}

/// Evaluate a binary operation on already-evaluated operands
pub fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaValue,
    right: &FormulaValue,
) -> FormulaResult<FormulaValue> {
    // Propagate errors
    if let Some(e) = left.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    if let Some(e) = right.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    match op {
        BinaryOperator::Add => numeric_result(left.to_number()?.checked_add(right.to_number()?)),
        BinaryOperator::Subtract => {
            numeric_result(left.to_number()?.checked_sub(right.to_number()?))
        }
        BinaryOperator::Multiply => {
            numeric_result(left.to_number()?.checked_mul(right.to_number()?))
        }
        BinaryOperator::Divide => {
            let l = left.to_number()?;
            let r = right.to_number()?;
            if r.is_zero() {
                return Err(FormulaError::DivisionByZero);
            }
            numeric_result(l.checked_div(r))
        }
        BinaryOperator::Power => power(left.to_number()?, right.to_number()?),

        BinaryOperator::Equal => Ok(FormulaValue::Boolean(
            compare_values(left, right) == Ordering::Equal,
        )),
        BinaryOperator::NotEqual => Ok(FormulaValue::Boolean(
            compare_values(left, right) != Ordering::Equal,
        )),
        BinaryOperator::LessThan => Ok(FormulaValue::Boolean(
            compare_values(left, right) == Ordering::Less,
        )),
        BinaryOperator::LessEqual => Ok(FormulaValue::Boolean(
            compare_values(left, right) != Ordering::Greater,
        )),
        BinaryOperator::GreaterThan => Ok(FormulaValue::Boolean(
            compare_values(left, right) == Ordering::Greater,
        )),
        BinaryOperator::GreaterEqual => Ok(FormulaValue::Boolean(
            compare_values(left, right) != Ordering::Less,
        )),

        BinaryOperator::Concat => {
            if matches!(left, FormulaValue::Array(_)) || matches!(right, FormulaValue::Array(_)) {
                return Err(FormulaError::Type("Cannot concatenate a range".into()));
            }
            Ok(FormulaValue::Text(left.as_string() + &right.as_string()))
        }
    }
}

/// `base ^ exponent` in decimal space
///
/// Integer exponents are exact; fractional exponents need a positive base.
pub(crate) fn power(base: Decimal, exponent: Decimal) -> FormulaResult<FormulaValue> {
    if base.is_zero() {
        return match exponent.cmp(&Decimal::ZERO) {
            Ordering::Less => Err(FormulaError::DivisionByZero),
            Ordering::Equal => Err(FormulaError::ErrorValue(CellError::Num)),
            Ordering::Greater => Ok(FormulaValue::Number(Decimal::ZERO)),
        };
    }
    if exponent.fract().is_zero() {
        let exp = exponent
            .to_i64()
            .ok_or(FormulaError::ErrorValue(CellError::Num))?;
        return numeric_result(base.checked_powi(exp));
    }
    if base.is_sign_negative() {
        return Err(FormulaError::ErrorValue(CellError::Num));
    }
    numeric_result(base.checked_powd(exponent))
}

/// Compare two values for ordering (spreadsheet-style comparison)
pub fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    // Empty adopts the type of the other side
    let left = match (left, right) {
        (FormulaValue::Empty, FormulaValue::Text(_)) => FormulaValue::Text(String::new()),
        (FormulaValue::Empty, FormulaValue::Boolean(_)) => FormulaValue::Boolean(false),
        (FormulaValue::Empty, _) => FormulaValue::Number(Decimal::ZERO),
        (v, _) => v.clone(),
    };
    let right = match (&left, right) {
        (FormulaValue::Text(_), FormulaValue::Empty) => FormulaValue::Text(String::new()),
        (FormulaValue::Boolean(_), FormulaValue::Empty) => FormulaValue::Boolean(false),
        (_, FormulaValue::Empty) => FormulaValue::Number(Decimal::ZERO),
        (_, v) => v.clone(),
    };

    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) => 0,
            FormulaValue::Text(_) => 1,
            FormulaValue::Boolean(_) => 2,
            FormulaValue::Error(_) => 3,
            FormulaValue::Array(_) | FormulaValue::Empty => 4,
        }
    }

    match (&left, &right) {
        (FormulaValue::Number(l), FormulaValue::Number(r)) => l.cmp(r),
        (FormulaValue::Text(l), FormulaValue::Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()),
        (FormulaValue::Boolean(l), FormulaValue::Boolean(r)) => l.cmp(r),
        (FormulaValue::Error(l), FormulaValue::Error(r)) => l.code().cmp(&r.code()),
        (l, r) => rank(l).cmp(&rank(r)),
    }
}

/// Evaluate a unary operation on an already-evaluated operand
fn evaluate_unary_op(op: UnaryOperator, operand: &FormulaValue) -> FormulaResult<FormulaValue> {
    if let Some(e) = operand.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let n = operand.to_number()?;
    match op {
        UnaryOperator::Negate => Ok(FormulaValue::Number(-n)),
        UnaryOperator::Percent => numeric_result(n.checked_div(Decimal::ONE_HUNDRED)),
    }
}

/// Evaluate a function call
fn evaluate_function(name: &str, args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaValue {
    let registry = function_registry();

    let func = match registry.get(name) {
        Some(func) => func,
        None => return ctx.fail(FormulaError::UnknownFunction(name.to_string())),
    };

    if let Err(e) = func.check_arity(args.len()) {
        return ctx.fail(e);
    }

    match func.implementation {
        // Lazy functions decide which arguments to evaluate
        Implementation::Lazy(f) => ctx.settle(f(args, ctx)),
        Implementation::Eager(f) => {
            let evaluated: Vec<FormulaValue> = args.iter().map(|arg| evaluate(arg, ctx)).collect();
            ctx.settle(f(&evaluated, ctx))
        }
    }
}
