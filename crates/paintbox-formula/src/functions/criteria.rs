//! Criteria matching for SUMIF, COUNTIF and AVERAGEIF
//!
//! A criterion can be:
//! - a number: exact numeric match (`5`)
//! - text: case-insensitive match with `*` and `?` wildcards (`"eggs*"`)
//! - a comparison: `">5"`, `">=10"`, `"<100"`, `"<=50"`, `"<>0"`, `"=5"`, `"<>flat"`
//! - an empty string: matches empty cells

use crate::evaluator::{parse_numeric_text, FormulaValue};
use rust_decimal::Decimal;

/// Matcher built once per call and applied to every cell of the range
#[derive(Debug)]
pub struct CriteriaMatcher {
    kind: CriteriaKind,
}

#[derive(Debug)]
enum CriteriaKind {
    Number(Decimal),
    Compare(ComparisonOp, Decimal),
    Text { pattern: String, negate: bool },
    Empty,
    Never,
}

#[derive(Debug, Clone, Copy)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl CriteriaMatcher {
    pub fn new(criteria: &FormulaValue) -> Self {
        let kind = match criteria {
            FormulaValue::Number(n) => CriteriaKind::Number(*n),
            FormulaValue::Boolean(b) => CriteriaKind::Number(if *b {
                Decimal::ONE
            } else {
                Decimal::ZERO
            }),
            FormulaValue::Text(s) => Self::parse_text(s),
            FormulaValue::Empty => CriteriaKind::Empty,
            FormulaValue::Error(_) | FormulaValue::Array(_) => CriteriaKind::Never,
        };
        Self { kind }
    }

    fn parse_text(s: &str) -> CriteriaKind {
        let s = s.trim();
        if s.is_empty() {
            return CriteriaKind::Empty;
        }

        let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
            (Some(ComparisonOp::GreaterEqual), rest)
        } else if let Some(rest) = s.strip_prefix("<=") {
            (Some(ComparisonOp::LessEqual), rest)
        } else if let Some(rest) = s.strip_prefix("<>") {
            (Some(ComparisonOp::NotEqual), rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (Some(ComparisonOp::GreaterThan), rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (Some(ComparisonOp::LessThan), rest)
        } else if let Some(rest) = s.strip_prefix('=') {
            (Some(ComparisonOp::Equal), rest)
        } else {
            (None, s)
        };

        let rest = rest.trim();
        match (op, parse_numeric_text(rest)) {
            (Some(op), Some(n)) => CriteriaKind::Compare(op, n),
            (None, Some(n)) => CriteriaKind::Number(n),
            (Some(ComparisonOp::NotEqual), None) if rest.is_empty() => CriteriaKind::Text {
                pattern: String::new(),
                negate: true,
            },
            (Some(ComparisonOp::Equal), None) if rest.is_empty() => CriteriaKind::Empty,
            (Some(ComparisonOp::NotEqual), None) => CriteriaKind::Text {
                pattern: rest.to_lowercase(),
                negate: true,
            },
            (Some(ComparisonOp::Equal) | None, None) => CriteriaKind::Text {
                pattern: rest.to_lowercase(),
                negate: false,
            },
            // Ordering against text: never matches numbers, so nothing to count
            (Some(_), None) => CriteriaKind::Never,
        }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.kind {
            // Text "5" does not match the number 5
            CriteriaKind::Number(expected) => match value {
                FormulaValue::Number(n) => n == expected,
                _ => false,
            },

            CriteriaKind::Compare(op, expected) => {
                let n = match value {
                    FormulaValue::Number(n) => *n,
                    _ => return matches!(op, ComparisonOp::NotEqual),
                };
                match op {
                    ComparisonOp::Equal => n == *expected,
                    ComparisonOp::NotEqual => n != *expected,
                    ComparisonOp::LessThan => n < *expected,
                    ComparisonOp::LessEqual => n <= *expected,
                    ComparisonOp::GreaterThan => n > *expected,
                    ComparisonOp::GreaterEqual => n >= *expected,
                }
            }

            CriteriaKind::Text { pattern, negate } => {
                let found = match value {
                    FormulaValue::Text(s) => wildcard_match(pattern, &s.to_lowercase()),
                    FormulaValue::Empty => pattern.is_empty(),
                    _ => false,
                };
                found != *negate
            }

            CriteriaKind::Empty => match value {
                FormulaValue::Empty => true,
                FormulaValue::Text(s) => s.is_empty(),
                _ => false,
            },

            CriteriaKind::Never => false,
        }
    }
}

/// Match with wildcards: `*` = any run of characters, `?` = one character
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return pattern == text;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let mut pi = 0;
    let mut ti = 0;
    let mut star: Option<(usize, usize)> = None;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = star {
            // Let the last star swallow one more character
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}
