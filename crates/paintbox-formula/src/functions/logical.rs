//! Logical functions
//!
//! `IF`, `IFS`, `IFERROR`, `IFNA` and `SWITCH` receive their argument
//! expressions unevaluated and only evaluate the branch they take.

use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{compare_values, evaluate, EvaluationContext, FormulaValue};
use paintbox_core::CellError;
use std::cmp::Ordering;

/// Evaluate a condition expression to a boolean, or the error it produced
fn condition(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<bool> {
    evaluate(expr, ctx).to_bool()
}

/// IF(logical_test, value_if_true, [value_if_false])
pub fn fn_if(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if condition(&args[0], ctx)? {
        Ok(evaluate(&args[1], ctx))
    } else {
        match args.get(2) {
            Some(expr) => Ok(evaluate(expr, ctx)),
            None => Ok(FormulaValue::Boolean(false)),
        }
    }
}

/// IFS(condition1, value1, [condition2, value2], ...)
pub fn fn_ifs(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if args.len() % 2 != 0 {
        return Err(FormulaError::ArgumentCount {
            function: "IFS".into(),
            expected: "condition/value pairs".into(),
            actual: args.len(),
        });
    }

    for pair in args.chunks(2) {
        if condition(&pair[0], ctx)? {
            return Ok(evaluate(&pair[1], ctx));
        }
    }

    Ok(FormulaValue::Error(CellError::Na))
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mark = ctx.mark();
    match evaluate(&args[0], ctx) {
        FormulaValue::Error(_) => {
            ctx.discard_since(mark);
            Ok(evaluate(&args[1], ctx))
        }
        value => Ok(value),
    }
}

/// IFNA(value, value_if_na)
pub fn fn_ifna(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mark = ctx.mark();
    match evaluate(&args[0], ctx) {
        FormulaValue::Error(CellError::Na) => {
            ctx.discard_since(mark);
            Ok(evaluate(&args[1], ctx))
        }
        value => Ok(value),
    }
}

/// SWITCH(expression, value1, result1, [value2, result2], ..., [default])
///
/// Matching is type-strict: the text `"1"` does not match the number 1.
pub fn fn_switch(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let subject = evaluate(&args[0], ctx);
    if let FormulaValue::Error(e) = subject {
        return Ok(FormulaValue::Error(e));
    }

    let cases = &args[1..];
    let mut pairs = cases.chunks_exact(2);
    for pair in pairs.by_ref() {
        let candidate = evaluate(&pair[0], ctx);
        if let FormulaValue::Error(e) = candidate {
            return Ok(FormulaValue::Error(e));
        }
        if values_match(&subject, &candidate) {
            return Ok(evaluate(&pair[1], ctx));
        }
    }

    match pairs.remainder() {
        [default] => Ok(evaluate(default, ctx)),
        _ => Ok(FormulaValue::Error(CellError::Na)),
    }
}

fn values_match(a: &FormulaValue, b: &FormulaValue) -> bool {
    let same_kind = std::mem::discriminant(a) == std::mem::discriminant(b)
        || matches!(a, FormulaValue::Empty)
        || matches!(b, FormulaValue::Empty);
    same_kind && compare_values(a, b) == Ordering::Equal
}

/// Gather the logical values AND/OR/XOR operate on
///
/// Inside ranges only booleans and numbers count; direct text must read as
/// TRUE/FALSE. No logical values at all is `#VALUE!`.
fn collect_logicals(args: &[FormulaValue]) -> FormulaResult<Vec<bool>> {
    let mut logicals = Vec::new();

    for arg in args {
        match arg {
            FormulaValue::Array(rows) => {
                for cell in rows.iter().flatten() {
                    match cell {
                        FormulaValue::Boolean(b) => logicals.push(*b),
                        FormulaValue::Number(n) => logicals.push(!n.is_zero()),
                        FormulaValue::Error(e) => return Err(FormulaError::ErrorValue(*e)),
                        _ => {} // Text and empty cells are skipped
                    }
                }
            }
            FormulaValue::Empty => {}
            scalar => logicals.push(scalar.to_bool()?),
        }
    }

    if logicals.is_empty() {
        return Err(FormulaError::Type("No logical values to evaluate".into()));
    }
    Ok(logicals)
}

/// AND(logical1, [logical2], ...)
pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let logicals = collect_logicals(args)?;
    Ok(FormulaValue::Boolean(logicals.iter().all(|b| *b)))
}

/// OR(logical1, [logical2], ...)
pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let logicals = collect_logicals(args)?;
    Ok(FormulaValue::Boolean(logicals.iter().any(|b| *b)))
}

/// XOR(logical1, [logical2], ...) - TRUE when an odd number of inputs are TRUE
pub fn fn_xor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let logicals = collect_logicals(args)?;
    let trues = logicals.iter().filter(|b| **b).count();
    Ok(FormulaValue::Boolean(trues % 2 == 1))
}

/// NOT(logical)
pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(!args[0].to_bool()?))
}

pub fn fn_true(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

pub fn fn_false(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn eval_with_issue(formula: &str) -> (FormulaValue, Option<FormulaError>) {
        let ast = parse_formula(formula).unwrap();
        let ctx = EvaluationContext::simple();
        let value = evaluate(&ast, &ctx);
        (value, ctx.take_issue())
    }

    fn eval(formula: &str) -> FormulaValue {
        eval_with_issue(formula).0
    }

    fn num(n: i64) -> FormulaValue {
        FormulaValue::Number(Decimal::from(n))
    }

    #[test]
    fn test_if_only_evaluates_taken_branch() {
        assert_eq!(eval_with_issue("=IF(TRUE, 1, 1/0)"), (num(1), None));
        assert_eq!(eval_with_issue("=IF(FALSE, NOSUCH(), 2)"), (num(2), None));
        assert_eq!(eval("=IF(0, 1)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=IF(\"maybe\", 1, 2)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=IF(1/0, 1, 2)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_ifs() {
        assert_eq!(eval("=IFS(1>2, \"a\", 2>1, \"b\")"), FormulaValue::Text("b".into()));
        assert_eq!(eval("=IFS(FALSE, 1)"), FormulaValue::Error(CellError::Na));
        assert_eq!(eval("=IFS(TRUE, 1, FALSE)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval_with_issue("=IFS(TRUE, 1, 1/0, 2)"), (num(1), None));
    }

    #[test]
    fn test_iferror_and_ifna() {
        assert_eq!(eval("=IFERROR(1/0, 0)"), num(0));
        assert_eq!(eval("=IFERROR(5, 0)"), num(5));
        assert_eq!(eval("=IFNA(NA(), \"none\")"), FormulaValue::Text("none".into()));
        assert_eq!(eval("=IFNA(1/0, 0)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_switch() {
        assert_eq!(
            eval("=SWITCH(\"satin\", \"flat\", 1, \"satin\", 2, 0)"),
            num(2)
        );
        assert_eq!(eval("=SWITCH(3, 1, \"a\", 2, \"b\", \"other\")"), FormulaValue::Text("other".into()));
        assert_eq!(eval("=SWITCH(3, 1, \"a\", 2, \"b\")"), FormulaValue::Error(CellError::Na));
        assert_eq!(eval("=SWITCH(\"1\", 1, \"num\", \"text\")"), FormulaValue::Text("text".into()));
        assert_eq!(eval_with_issue("=SWITCH(1, 1, 10, 2, 1/0)"), (num(10), None));
    }

    #[test]
    fn test_and_or_xor() {
        assert_eq!(eval("=AND(TRUE, 1, \"true\")"), FormulaValue::Boolean(true));
        assert_eq!(eval("=AND(TRUE, 0)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=OR(FALSE, 0, 2)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=OR(\"yes\")"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=AND({\"a\", \"b\"})"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=AND({1, \"a\", TRUE})"), FormulaValue::Boolean(true));
        assert_eq!(eval("=XOR(TRUE, TRUE, TRUE)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=XOR(TRUE, TRUE)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=AND(TRUE, #N/A)"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_not_true_false() {
        assert_eq!(eval("=NOT(TRUE)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=NOT(0)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=TRUE()"), FormulaValue::Boolean(true));
        assert_eq!(eval("=FALSE()"), FormulaValue::Boolean(false));
    }
}
