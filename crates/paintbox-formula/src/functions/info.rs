//! Information functions

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use paintbox_core::CellError;
use rust_decimal::Decimal;

/// The single value an IS* function inspects
fn inspected(args: &[FormulaValue]) -> FormulaResult<&FormulaValue> {
    match &args[0] {
        FormulaValue::Array(_) => Err(FormulaError::Type(
            "Expected a single value, got a range".into(),
        )),
        v => Ok(v),
    }
}

/// ISBLANK(value)
pub fn fn_isblank(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let v = inspected(args)?;
    Ok(FormulaValue::Boolean(matches!(v, FormulaValue::Empty)))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let v = inspected(args)?;
    Ok(FormulaValue::Boolean(matches!(v, FormulaValue::Number(_))))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let v = inspected(args)?;
    Ok(FormulaValue::Boolean(matches!(v, FormulaValue::Text(_))))
}

/// ISLOGICAL(value)
pub fn fn_islogical(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let v = inspected(args)?;
    Ok(FormulaValue::Boolean(matches!(v, FormulaValue::Boolean(_))))
}

/// ISERROR(value)
pub fn fn_iserror(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let v = inspected(args)?;
    Ok(FormulaValue::Boolean(v.is_error()))
}

/// ISNA(value)
pub fn fn_isna(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let v = inspected(args)?;
    Ok(FormulaValue::Boolean(matches!(
        v,
        FormulaValue::Error(CellError::Na)
    )))
}

/// NA()
pub fn fn_na(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Error(CellError::Na))
}

/// N(value) - numbers pass through, TRUE is 1, everything else 0
pub fn fn_n(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = match inspected(args)? {
        FormulaValue::Number(n) => *n,
        FormulaValue::Boolean(true) => Decimal::ONE,
        FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
        _ => Decimal::ZERO,
    };
    Ok(FormulaValue::Number(n))
}
