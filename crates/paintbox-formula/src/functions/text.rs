//! Text functions

use super::{flatten, int_arg, text_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{parse_numeric_text, EvaluationContext, FormulaValue};
use rust_decimal::prelude::*;

fn take_left(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn take_right(s: &str, n: usize) -> String {
    let len = s.chars().count();
    if n >= len {
        return s.to_string();
    }
    s.chars().skip(len - n).collect()
}

fn take_mid(s: &str, start_1based: usize, n: usize) -> String {
    s.chars().skip(start_1based - 1).take(n).collect()
}

/// Character count argument; negative counts are `#VALUE!`
fn count_arg(args: &[FormulaValue], index: usize, default: i64) -> FormulaResult<usize> {
    let n = int_arg(args, index, default)?;
    usize::try_from(n).map_err(|_| FormulaError::Type(format!("Character count {} is negative", n)))
}

/// LEN(text)
pub fn fn_len(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    Ok(FormulaValue::Number(Decimal::from(s.chars().count())))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1)?;
    Ok(FormulaValue::Text(take_left(&s, n)))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1)?;
    Ok(FormulaValue::Text(take_right(&s, n)))
}

/// MID(text, start_num, num_chars)
pub fn fn_mid(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    let start = count_arg(args, 1, 1)?;
    if start == 0 {
        return Err(FormulaError::Type("MID start must be at least 1".into()));
    }
    let n = count_arg(args, 2, 0)?;
    Ok(FormulaValue::Text(take_mid(&s, start, n)))
}

/// UPPER(text)
pub fn fn_upper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(text_arg(args, 0)?.to_uppercase()))
}

/// LOWER(text)
pub fn fn_lower(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(text_arg(args, 0)?.to_lowercase()))
}

/// TRIM(text) - strips the ends and collapses inner runs of spaces
pub fn fn_trim(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    Ok(FormulaValue::Text(
        s.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}

/// CONCATENATE(text1, [text2], ...) - scalar arguments only
pub fn fn_concatenate(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let mut out = String::new();
    for index in 0..args.len() {
        out.push_str(&text_arg(args, index)?);
    }
    Ok(FormulaValue::Text(out))
}

/// CONCAT(text1, [text2], ...) - ranges are joined row by row
pub fn fn_concat(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut out = String::new();
    for value in args.iter().flat_map(flatten) {
        if let FormulaValue::Error(e) = value {
            return Ok(FormulaValue::Error(*e));
        }
        out.push_str(&value.as_string());
    }
    Ok(FormulaValue::Text(out))
}

/// VALUE(text) - accepts `$` and thousands separators
pub fn fn_value(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match &args[0] {
        FormulaValue::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaValue::Empty => Ok(FormulaValue::Number(Decimal::ZERO)),
        FormulaValue::Error(e) => Ok(FormulaValue::Error(*e)),
        FormulaValue::Text(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            parse_numeric_text(&cleaned)
                .map(FormulaValue::Number)
                .ok_or_else(|| FormulaError::Type(format!("\"{}\" is not a number", s)))
        }
        other => Err(FormulaError::Type(format!(
            "Cannot convert {} to number",
            other.describe()
        ))),
    }
}

/// A fixed-decimal number format such as `0`, `0.00`, `#,##0.00`, `$#,##0` or `0.0%`
struct NumberFormat {
    prefix: String,
    decimals: u32,
    grouping: bool,
    percent: bool,
}

impl NumberFormat {
    fn parse(format: &str) -> Option<Self> {
        let body_start = format.find(['0', '#'])?;
        let prefix = &format[..body_start];
        let body = &format[body_start..];
        let (body, percent) = match body.strip_suffix('%') {
            Some(rest) => (rest, true),
            None => (body, false),
        };

        let (integer, fraction) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if !integer.chars().all(|c| matches!(c, '0' | '#' | ','))
            || !fraction.chars().all(|c| c == '0')
            || prefix.chars().any(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }

        Some(Self {
            prefix: prefix.to_string(),
            decimals: u32::try_from(fraction.len()).ok()?,
            grouping: integer.contains(','),
            percent,
        })
    }

    fn apply(&self, n: Decimal) -> Option<String> {
        let n = if self.percent {
            n.checked_mul(Decimal::ONE_HUNDRED)?
        } else {
            n
        };
        let rounded = n.round_dp_with_strategy(self.decimals, RoundingStrategy::MidpointAwayFromZero);
        let digits = format!("{:.*}", self.decimals as usize, rounded.abs());
        let (integer, fraction) = match digits.split_once('.') {
            Some((i, f)) => (i.to_string(), Some(f.to_string())),
            None => (digits, None),
        };

        let integer = if self.grouping {
            group_thousands(&integer)
        } else {
            integer
        };

        let mut out = String::new();
        if rounded.is_sign_negative() && !rounded.is_zero() {
            out.push('-');
        }
        out.push_str(&self.prefix);
        out.push_str(&integer);
        if let Some(fraction) = fraction {
            out.push('.');
            out.push_str(&fraction);
        }
        if self.percent {
            out.push('%');
        }
        Some(out)
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// TEXT(value, format_text) - fixed-decimal number formats only
pub fn fn_text(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let format = text_arg(args, 1)?;
    let n = match &args[0] {
        FormulaValue::Text(s) => match parse_numeric_text(s) {
            Some(n) => n,
            None => return Ok(FormulaValue::Text(s.clone())),
        },
        v => v.to_number()?,
    };

    NumberFormat::parse(&format)
        .and_then(|fmt| fmt.apply(n))
        .map(FormulaValue::Text)
        .ok_or_else(|| FormulaError::Type(format!("Unsupported number format \"{}\"", format)))
}

/// EXACT(text1, text2) - case-sensitive comparison
pub fn fn_exact(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let a = text_arg(args, 0)?;
    let b = text_arg(args, 1)?;
    Ok(FormulaValue::Boolean(a == b))
}
