//! Math functions
//!
//! All arithmetic is decimal. Rounding happens in decimal space, so
//! `ROUND(2.675, 2)` is `2.68` and `CEILING(0.3/0.1, 1)` is `3`.

use super::statistical::conditional_numbers;
use super::{as_grid, collect_numbers, grid_dims, int_arg, number_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{parse_numeric_text, power, EvaluationContext, FormulaValue};
use paintbox_core::CellError;
use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;

fn num_error() -> FormulaError {
    FormulaError::ErrorValue(CellError::Num)
}

fn number(n: Option<Decimal>) -> FormulaResult<FormulaValue> {
    n.map(FormulaValue::Number).ok_or_else(num_error)
}

fn checked_sum(numbers: &[Decimal]) -> FormulaResult<Decimal> {
    numbers
        .iter()
        .try_fold(Decimal::ZERO, |acc, n| acc.checked_add(*n))
        .ok_or_else(num_error)
}

/// Round `n` to `digits` places; negative digits round left of the point
fn round_with(n: Decimal, digits: i64, strategy: RoundingStrategy) -> FormulaResult<Decimal> {
    if digits >= 0 {
        let dp = u32::try_from(digits.min(28)).map_err(|_| num_error())?;
        return Ok(n.round_dp_with_strategy(dp, strategy));
    }
    if digits < -28 {
        return Ok(Decimal::ZERO);
    }
    let factor = Decimal::TEN
        .checked_powi(-digits)
        .ok_or_else(num_error)?;
    let scaled = n.checked_div(factor).ok_or_else(num_error)?;
    scaled
        .round_dp_with_strategy(0, strategy)
        .checked_mul(factor)
        .ok_or_else(num_error)
}

/// `units(n / step) * step` with decimal checked arithmetic
fn snap(n: Decimal, step: Decimal, units: fn(&Decimal) -> Decimal) -> FormulaResult<FormulaValue> {
    let quotient = n.checked_div(step).ok_or_else(num_error)?;
    number(units(&quotient).checked_mul(step))
}

/// SUM(number1, [number2], ...)
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    Ok(FormulaValue::Number(checked_sum(&numbers)?))
}

/// PRODUCT(number1, [number2], ...) - 0 when there is nothing to multiply
pub fn fn_product(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(Decimal::ZERO));
    }
    number(
        numbers
            .iter()
            .try_fold(Decimal::ONE, |acc, n| acc.checked_mul(*n)),
    )
}

/// SUMPRODUCT(array1, [array2], ...)
///
/// All arrays must share dimensions; non-numeric entries count as 0.
pub fn fn_sumproduct(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let grids: Vec<_> = args.iter().map(as_grid).collect();
    let dims = grid_dims(&grids[0]);
    if grids.iter().any(|g| grid_dims(g) != dims) {
        return Err(FormulaError::Type(
            "SUMPRODUCT arrays must have the same dimensions".into(),
        ));
    }

    let mut total = Decimal::ZERO;
    for row in 0..dims.0 {
        for col in 0..dims.1 {
            let mut product = Decimal::ONE;
            for grid in &grids {
                match &grid[row][col] {
                    FormulaValue::Number(n) => {
                        product = product.checked_mul(*n).ok_or_else(num_error)?
                    }
                    FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
                    _ => product = Decimal::ZERO,
                }
            }
            total = total.checked_add(product).ok_or_else(num_error)?;
        }
    }

    Ok(FormulaValue::Number(total))
}

/// AVERAGE(number1, [number2], ...)
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(FormulaError::DivisionByZero);
    }
    let sum = checked_sum(&numbers)?;
    number(sum.checked_div(Decimal::from(numbers.len())))
}

/// MIN(number1, [number2], ...) - 0 when no numbers are found
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    Ok(FormulaValue::Number(
        numbers.into_iter().min().unwrap_or(Decimal::ZERO),
    ))
}

/// MAX(number1, [number2], ...) - 0 when no numbers are found
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    Ok(FormulaValue::Number(
        numbers.into_iter().max().unwrap_or(Decimal::ZERO),
    ))
}

/// COUNT(value1, [value2], ...)
///
/// Counts numbers inside ranges, plus direct arguments that read as numbers.
/// Errors are not counted and do not propagate.
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .map(|arg| match arg {
            FormulaValue::Array(rows) => rows
                .iter()
                .flatten()
                .filter(|v| matches!(v, FormulaValue::Number(_)))
                .count(),
            FormulaValue::Number(_) | FormulaValue::Boolean(_) => 1,
            FormulaValue::Text(s) => usize::from(parse_numeric_text(s).is_some()),
            _ => 0,
        })
        .sum::<usize>();

    Ok(FormulaValue::Number(Decimal::from(count)))
}

/// ABS(number)
pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].to_number()?.abs()))
}

/// ROUND(number, num_digits) - half away from zero
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let digits = int_arg(args, 1, 0)?;
    Ok(FormulaValue::Number(round_with(
        n,
        digits,
        RoundingStrategy::MidpointAwayFromZero,
    )?))
}

/// ROUNDUP(number, num_digits) - away from zero
pub fn fn_roundup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let digits = int_arg(args, 1, 0)?;
    Ok(FormulaValue::Number(round_with(
        n,
        digits,
        RoundingStrategy::AwayFromZero,
    )?))
}

/// ROUNDDOWN(number, num_digits) - toward zero
pub fn fn_rounddown(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let digits = int_arg(args, 1, 0)?;
    Ok(FormulaValue::Number(round_with(n, digits, RoundingStrategy::ToZero)?))
}

/// MROUND(number, multiple) - nearest multiple, half away from zero
pub fn fn_mround(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let multiple = args[1].to_number()?;
    if multiple.is_zero() {
        return Ok(FormulaValue::Number(Decimal::ZERO));
    }
    if !n.is_zero() && n.is_sign_negative() != multiple.is_sign_negative() {
        return Err(num_error());
    }
    let quotient = n.checked_div(multiple).ok_or_else(num_error)?;
    number(
        quotient
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(multiple),
    )
}

/// CEILING(number, significance)
///
/// Positive number with negative significance is `#NUM!`; zero significance
/// gives 0. A negative number with positive significance rounds toward zero,
/// both negative rounds away from zero.
pub fn fn_ceiling(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let significance = args[1].to_number()?;
    if n.is_sign_positive() && !n.is_zero() && significance.is_sign_negative() {
        return Err(num_error());
    }
    if significance.is_zero() {
        return Ok(FormulaValue::Number(Decimal::ZERO));
    }
    snap(n, significance, Decimal::ceil)
}

/// CEILING.MATH(number, [significance], [mode])
///
/// The significance sign is ignored. Negative numbers round toward zero unless
/// `mode` is non-zero.
pub fn fn_ceiling_math(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let significance = number_arg(args, 1, Decimal::ONE)?.abs();
    let mode = number_arg(args, 2, Decimal::ZERO)?;
    if significance.is_zero() {
        return Ok(FormulaValue::Number(Decimal::ZERO));
    }
    if n.is_sign_negative() && !mode.is_zero() {
        snap(n, significance, Decimal::floor)
    } else {
        snap(n, significance, Decimal::ceil)
    }
}

/// FLOOR(number, significance)
pub fn fn_floor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let significance = args[1].to_number()?;
    if n.is_sign_positive() && !n.is_zero() && significance.is_sign_negative() {
        return Err(num_error());
    }
    if significance.is_zero() {
        return if n.is_zero() {
            Ok(FormulaValue::Number(Decimal::ZERO))
        } else {
            Err(FormulaError::DivisionByZero)
        };
    }
    snap(n, significance, Decimal::floor)
}

/// FLOOR.MATH(number, [significance], [mode])
///
/// Negative numbers round away from zero unless `mode` is non-zero.
pub fn fn_floor_math(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let significance = number_arg(args, 1, Decimal::ONE)?.abs();
    let mode = number_arg(args, 2, Decimal::ZERO)?;
    if significance.is_zero() {
        return Ok(FormulaValue::Number(Decimal::ZERO));
    }
    if n.is_sign_negative() && !mode.is_zero() {
        snap(n, significance, Decimal::ceil)
    } else {
        snap(n, significance, Decimal::floor)
    }
}

/// INT(number) - rounds down to the nearest integer
pub fn fn_int(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].to_number()?.floor()))
}

/// TRUNC(number, [num_digits])
pub fn fn_trunc(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let digits = int_arg(args, 1, 0)?;
    Ok(FormulaValue::Number(round_with(n, digits, RoundingStrategy::ToZero)?))
}

/// MOD(number, divisor) - the result takes the sign of the divisor
pub fn fn_mod(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let divisor = args[1].to_number()?;
    if divisor.is_zero() {
        return Err(FormulaError::DivisionByZero);
    }
    let rem = n.checked_rem(divisor).ok_or_else(num_error)?;
    if !rem.is_zero() && rem.is_sign_negative() != divisor.is_sign_negative() {
        number(rem.checked_add(divisor))
    } else {
        Ok(FormulaValue::Number(rem))
    }
}

/// POWER(number, power)
pub fn fn_power(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    power(args[0].to_number()?, args[1].to_number()?)
}

/// SQRT(number)
pub fn fn_sqrt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    if n.is_sign_negative() && !n.is_zero() {
        return Err(num_error());
    }
    number(n.sqrt())
}

/// SIGN(number)
pub fn fn_sign(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let sign = match n.cmp(&Decimal::ZERO) {
        std::cmp::Ordering::Less => Decimal::NEGATIVE_ONE,
        std::cmp::Ordering::Equal => Decimal::ZERO,
        std::cmp::Ordering::Greater => Decimal::ONE,
    };
    Ok(FormulaValue::Number(sign))
}

/// SUMIF(range, criteria, [sum_range])
///
/// `sum_range` is read at the same offsets as `range`; cells outside it are skipped.
pub fn fn_sumif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = conditional_numbers(args)?;
    Ok(FormulaValue::Number(checked_sum(&numbers)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn ctx() -> EvaluationContext<'static> {
        EvaluationContext::simple()
    }

    fn n(s: &str) -> FormulaValue {
        FormulaValue::Number(Decimal::from_str(s).unwrap())
    }

    fn call(f: crate::functions::FunctionImpl, args: &[FormulaValue]) -> FormulaValue {
        let ctx = ctx();
        ctx.settle(f(args, &ctx))
    }

    fn err(e: CellError) -> FormulaValue {
        FormulaValue::Error(e)
    }

    #[test]
    fn test_sum_skips_text_in_ranges() {
        let range = FormulaValue::Array(vec![
            vec![n("1.5"), FormulaValue::Text("x".into())],
            vec![FormulaValue::Boolean(true), n("2.5")],
        ]);
        assert_eq!(call(fn_sum, &[range, n("1")]), n("5"));
        assert_eq!(
            call(fn_sum, &[FormulaValue::Text("x".into())]),
            err(CellError::Value)
        );
        assert_eq!(call(fn_sum, &[n("1"), err(CellError::Na)]), err(CellError::Na));
    }

    #[test]
    fn test_average_min_max() {
        let range = FormulaValue::Array(vec![vec![n("2"), n("4"), FormulaValue::Empty, n("9")]]);
        assert_eq!(call(fn_average, &[range.clone()]), n("5"));
        assert_eq!(call(fn_min, &[range.clone()]), n("2"));
        assert_eq!(call(fn_max, &[range]), n("9"));
        assert_eq!(
            call(fn_average, &[FormulaValue::Array(vec![vec![FormulaValue::Empty]])]),
            err(CellError::Div0)
        );
        assert_eq!(call(fn_max, &[FormulaValue::Array(vec![vec![]])]), n("0"));
    }

    #[test]
    fn test_product_and_sumproduct() {
        assert_eq!(call(fn_product, &[n("2"), n("3.5")]), n("7"));
        let a = FormulaValue::Array(vec![vec![n("1"), n("2")], vec![n("3"), n("4")]]);
        let b = FormulaValue::Array(vec![vec![n("10"), n("10")], vec![n("1"), FormulaValue::Text("x".into())]]);
        assert_eq!(call(fn_sumproduct, &[a.clone(), b]), n("33"));
        let c = FormulaValue::Array(vec![vec![n("1"), n("2")]]);
        assert_eq!(call(fn_sumproduct, &[a, c]), err(CellError::Value));
    }

    #[test]
    fn test_count() {
        let range = FormulaValue::Array(vec![vec![n("1"), FormulaValue::Text("2".into()), err(CellError::Na)]]);
        assert_eq!(call(fn_count, &[range, FormulaValue::Text("3".into()), FormulaValue::Boolean(true)]), n("3"));
    }

    #[test]
    fn test_round_family_is_decimal() {
        assert_eq!(call(fn_round, &[n("2.675"), n("2")]), n("2.68"));
        assert_eq!(call(fn_round, &[n("2.5"), n("0")]), n("3"));
        assert_eq!(call(fn_round, &[n("-2.5"), n("0")]), n("-3"));
        assert_eq!(call(fn_round, &[n("1234.5"), n("-2")]), n("1200"));
        assert_eq!(call(fn_round, &[n("1250"), n("-2")]), n("1300"));
        assert_eq!(call(fn_roundup, &[n("3.14159"), n("3")]), n("3.142"));
        assert_eq!(call(fn_roundup, &[n("-3.001"), n("0")]), n("-4"));
        assert_eq!(call(fn_roundup, &[n("1201"), n("-2")]), n("1300"));
        assert_eq!(call(fn_rounddown, &[n("3.999"), n("0")]), n("3"));
        assert_eq!(call(fn_rounddown, &[n("-3.999"), n("1")]), n("-3.9"));
        assert_eq!(call(fn_trunc, &[n("-8.9")]), n("-8"));
        assert_eq!(call(fn_int, &[n("-8.1")]), n("-9"));
    }

    #[test]
    fn test_mround() {
        assert_eq!(call(fn_mround, &[n("10"), n("3")]), n("9"));
        assert_eq!(call(fn_mround, &[n("7.5"), n("5")]), n("10"));
        assert_eq!(call(fn_mround, &[n("5"), n("-2")]), err(CellError::Num));
        assert_eq!(call(fn_mround, &[n("5"), n("0")]), n("0"));
    }

    #[test]
    fn test_ceiling() {
        assert_eq!(call(fn_ceiling, &[n("2.5"), n("1")]), n("3"));
        assert_eq!(call(fn_ceiling, &[n("1.71"), n("0.25")]), n("1.75"));
        assert_eq!(call(fn_ceiling, &[n("-2.5"), n("1")]), n("-2"));
        assert_eq!(call(fn_ceiling, &[n("-2.5"), n("-1")]), n("-3"));
        assert_eq!(call(fn_ceiling, &[n("2.5"), n("-1")]), err(CellError::Num));
        assert_eq!(call(fn_ceiling, &[n("2.5"), n("0")]), n("0"));
        assert_eq!(call(fn_ceiling, &[n("1.7657"), n("1")]), n("2"));
    }

    #[test]
    fn test_ceiling_and_floor_math() {
        assert_eq!(call(fn_ceiling_math, &[n("24.3"), n("5")]), n("25"));
        assert_eq!(call(fn_ceiling_math, &[n("-8.1"), n("2")]), n("-8"));
        assert_eq!(call(fn_ceiling_math, &[n("-5.5"), n("2"), n("-1")]), n("-6"));
        assert_eq!(call(fn_ceiling_math, &[n("6.7")]), n("7"));
        assert_eq!(call(fn_floor_math, &[n("24.3"), n("5")]), n("20"));
        assert_eq!(call(fn_floor_math, &[n("-8.1"), n("2")]), n("-10"));
        assert_eq!(call(fn_floor_math, &[n("-5.5"), n("2"), n("-1")]), n("-4"));
    }

    #[test]
    fn test_floor() {
        assert_eq!(call(fn_floor, &[n("3.7"), n("2")]), n("2"));
        assert_eq!(call(fn_floor, &[n("-2.5"), n("-2")]), n("-2"));
        assert_eq!(call(fn_floor, &[n("-2.5"), n("1")]), n("-3"));
        assert_eq!(call(fn_floor, &[n("2.5"), n("-2")]), err(CellError::Num));
        assert_eq!(call(fn_floor, &[n("2.5"), n("0")]), err(CellError::Div0));
    }

    #[test]
    fn test_mod_sign_follows_divisor() {
        assert_eq!(call(fn_mod, &[n("3"), n("2")]), n("1"));
        assert_eq!(call(fn_mod, &[n("-3"), n("2")]), n("1"));
        assert_eq!(call(fn_mod, &[n("3"), n("-2")]), n("-1"));
        assert_eq!(call(fn_mod, &[n("5.5"), n("2")]), n("1.5"));
        assert_eq!(call(fn_mod, &[n("1"), n("0")]), err(CellError::Div0));
    }

    #[test]
    fn test_power_sqrt_sign_abs() {
        assert_eq!(call(fn_power, &[n("2"), n("3")]), n("8"));
        assert_eq!(call(fn_power, &[n("0"), n("-1")]), err(CellError::Div0));
        match call(fn_sqrt, &[n("16")]) {
            FormulaValue::Number(root) => assert_eq!(root.round_dp(10), Decimal::from(4)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(call(fn_sqrt, &[n("-1")]), err(CellError::Num));
        assert_eq!(call(fn_sign, &[n("-0.5")]), n("-1"));
        assert_eq!(call(fn_sign, &[n("0")]), n("0"));
        assert_eq!(call(fn_abs, &[n("-4.25")]), n("4.25"));
        assert_eq!(call(fn_abs, &[FormulaValue::Text("x".into())]), err(CellError::Value));
    }

    #[test]
    fn test_sumif() {
        let kinds = FormulaValue::Array(vec![
            vec![FormulaValue::Text("wall".into())],
            vec![FormulaValue::Text("trim".into())],
            vec![FormulaValue::Text("Wall".into())],
        ]);
        let areas = FormulaValue::Array(vec![vec![n("300")], vec![n("40")], vec![n("120")]]);
        assert_eq!(
            call(fn_sumif, &[kinds, FormulaValue::Text("wall".into()), areas.clone()]),
            n("420")
        );
        assert_eq!(call(fn_sumif, &[areas, FormulaValue::Text(">100".into())]), n("420"));
    }
}
