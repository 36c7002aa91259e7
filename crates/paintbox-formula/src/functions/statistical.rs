//! Counting and conditional aggregation

use super::as_grid;
use super::criteria::CriteriaMatcher;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use rust_decimal::Decimal;

/// Numbers selected by `(range, criteria, [value_range])`
///
/// `value_range` is read at the same offsets as `range`; cells outside it and
/// non-numeric cells are skipped. An error in a selected cell is returned.
pub(crate) fn conditional_numbers(args: &[FormulaValue]) -> FormulaResult<Vec<Decimal>> {
    if let FormulaValue::Error(e) = &args[0] {
        return Err(FormulaError::ErrorValue(*e));
    }
    let range = as_grid(&args[0]);
    let matcher = CriteriaMatcher::new(&args[1]);
    let values = match args.get(2) {
        Some(FormulaValue::Error(e)) => return Err(FormulaError::ErrorValue(*e)),
        Some(v) => as_grid(v),
        None => range.clone(),
    };

    let mut numbers = Vec::new();
    for (r, row) in range.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if !matcher.matches(cell) {
                continue;
            }
            match values.get(r).and_then(|row| row.get(c)) {
                Some(FormulaValue::Number(n)) => numbers.push(*n),
                Some(FormulaValue::Error(e)) => return Err(FormulaError::ErrorValue(*e)),
                _ => {}
            }
        }
    }
    Ok(numbers)
}

/// COUNTA(value1, [value2], ...) - counts every non-empty value, errors included
pub fn fn_counta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .flat_map(super::flatten)
        .filter(|v| !matches!(v, FormulaValue::Empty))
        .count();
    Ok(FormulaValue::Number(Decimal::from(count)))
}

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if let FormulaValue::Error(e) = &args[0] {
        return Ok(FormulaValue::Error(*e));
    }
    let matcher = CriteriaMatcher::new(&args[1]);
    let count = super::flatten(&args[0])
        .filter(|cell| matcher.matches(cell))
        .count();
    Ok(FormulaValue::Number(Decimal::from(count)))
}

/// AVERAGEIF(range, criteria, [average_range])
pub fn fn_averageif(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let numbers = conditional_numbers(args)?;
    if numbers.is_empty() {
        return Err(FormulaError::DivisionByZero);
    }
    let sum = numbers
        .iter()
        .try_fold(Decimal::ZERO, |acc, n| acc.checked_add(*n))
        .and_then(|sum| sum.checked_div(Decimal::from(numbers.len())));
    sum.map(FormulaValue::Number)
        .ok_or(FormulaError::ErrorValue(paintbox_core::CellError::Num))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate;
    use crate::parser::parse_formula;
    use paintbox_core::CellError;
    use pretty_assertions::assert_eq;

    fn eval(formula: &str) -> FormulaValue {
        let ast = parse_formula(formula).unwrap();
        let ctx = EvaluationContext::simple();
        evaluate(&ast, &ctx)
    }

    fn num(n: i64) -> FormulaValue {
        FormulaValue::Number(Decimal::from(n))
    }

    #[test]
    fn test_counta() {
        assert_eq!(eval("=COUNTA({1,\"a\",TRUE,#N/A})"), num(4));
        assert_eq!(eval("=COUNTA(\"\", 0)"), num(2));
    }

    #[test]
    fn test_countif() {
        assert_eq!(eval("=COUNTIF({120,80,300,45},\">100\")"), num(2));
        assert_eq!(eval("=COUNTIF({\"flat\",\"satin\",\"Flat\"},\"flat\")"), num(2));
        assert_eq!(eval("=COUNTIF({\"flat\",\"satin\",\"Flat\"},\"s*\")"), num(1));
        assert_eq!(eval("=COUNTIF(1/0,1)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_averageif() {
        assert_eq!(eval("=AVERAGEIF({10,20,30,40},\">15\")"), num(30));
        assert_eq!(
            eval("=AVERAGEIF({\"good\",\"poor\",\"poor\"},\"poor\",{1,4,6})"),
            num(5)
        );
        assert_eq!(
            eval("=AVERAGEIF({1,2},\">5\")"),
            FormulaValue::Error(CellError::Div0)
        );
    }
}
