//! Lookup functions
//!
//! Approximate lookups assume ascending keys and behave like a binary search:
//! they return the *last* key less than or equal to the lookup value, so
//! duplicate keys resolve to the last duplicate. Exact lookups return the
//! first match and compare text case-insensitively. A miss is `#N/A`.

use super::{as_grid, first_error, grid_dims, int_arg};
use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{compare_values, evaluate, EvaluationContext, FormulaValue};
use paintbox_core::CellError;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::mem::discriminant;

/// How keys are matched against the lookup value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    /// First key equal to the value
    Exact,
    /// Last key <= value, keys ascending
    AscendingApprox,
    /// Last key >= value, keys descending
    DescendingApprox,
}

fn same_kind(a: &FormulaValue, b: &FormulaValue) -> bool {
    discriminant(a) == discriminant(b)
}

fn values_equal(a: &FormulaValue, b: &FormulaValue) -> bool {
    same_kind(a, b) && compare_values(a, b) == Ordering::Equal
}

/// Position of `value` among `keys`, if any
fn find_position(value: &FormulaValue, keys: &[&FormulaValue], mode: MatchMode) -> Option<usize> {
    // A blank lookup value never matches, not even a blank key
    if matches!(value, FormulaValue::Empty) {
        return None;
    }
    if mode == MatchMode::Exact {
        return keys.iter().position(|k| values_equal(k, value));
    }

    // Empty cells are skipped by the search, as are keys of another type
    let candidates: Vec<(usize, &FormulaValue)> = keys
        .iter()
        .enumerate()
        .filter(|(_, k)| !matches!(k, FormulaValue::Empty))
        .map(|(i, k)| (i, *k))
        .collect();

    let point = match mode {
        MatchMode::AscendingApprox => {
            candidates.partition_point(|(_, k)| compare_values(k, value) != Ordering::Greater)
        }
        _ => candidates.partition_point(|(_, k)| compare_values(k, value) != Ordering::Less),
    };

    let (index, key) = *candidates.get(point.checked_sub(1)?)?;
    same_kind(key, value).then_some(index)
}

fn lookup_value(value: &FormulaValue) -> FormulaResult<&FormulaValue> {
    match value {
        FormulaValue::Error(e) => Err(FormulaError::ErrorValue(*e)),
        FormulaValue::Array(_) => Err(FormulaError::Type(
            "Lookup value must be a single value".into(),
        )),
        v => Ok(v),
    }
}

fn range_lookup_mode(args: &[FormulaValue], index: usize) -> FormulaResult<MatchMode> {
    let approximate = match args.get(index) {
        Some(v) => v.to_bool()?,
        None => true,
    };
    Ok(if approximate {
        MatchMode::AscendingApprox
    } else {
        MatchMode::Exact
    })
}

fn not_found() -> FormulaError {
    FormulaError::ErrorValue(CellError::Na)
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
pub fn fn_vlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = lookup_value(&args[0])?;
    if let FormulaValue::Error(e) = &args[1] {
        return Ok(FormulaValue::Error(*e));
    }
    let table = as_grid(&args[1]);
    let (_, cols) = grid_dims(&table);
    let col_index = int_arg(args, 2, 1)?;
    if col_index < 1 {
        return Err(FormulaError::Type("Column index must be at least 1".into()));
    }
    let col = usize::try_from(col_index - 1).map_err(|_| not_found())?;
    if col >= cols {
        return Err(FormulaError::InvalidReference(format!(
            "Column {} is outside a {}-column table",
            col_index, cols
        )));
    }
    let mode = range_lookup_mode(args, 3)?;

    let keys: Vec<&FormulaValue> = table.iter().filter_map(|row| row.first()).collect();
    let row = find_position(value, &keys, mode).ok_or_else(not_found)?;
    Ok(table[row][col].clone())
}

/// HLOOKUP(lookup_value, table_array, row_index_num, [range_lookup])
pub fn fn_hlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = lookup_value(&args[0])?;
    if let FormulaValue::Error(e) = &args[1] {
        return Ok(FormulaValue::Error(*e));
    }
    let table = as_grid(&args[1]);
    let (rows, _) = grid_dims(&table);
    let row_index = int_arg(args, 2, 1)?;
    if row_index < 1 {
        return Err(FormulaError::Type("Row index must be at least 1".into()));
    }
    let row = usize::try_from(row_index - 1).map_err(|_| not_found())?;
    if row >= rows {
        return Err(FormulaError::InvalidReference(format!(
            "Row {} is outside a {}-row table",
            row_index, rows
        )));
    }
    let mode = range_lookup_mode(args, 3)?;

    let keys: Vec<&FormulaValue> = table.first().map(|r| r.iter().collect()).unwrap_or_default();
    let col = find_position(value, &keys, mode).ok_or_else(not_found)?;
    table[row]
        .get(col)
        .cloned()
        .ok_or_else(not_found)
}

/// MATCH(lookup_value, lookup_array, [match_type]) - 1-based position
///
/// `match_type` 1 (default) is ascending approximate, 0 exact, -1 descending
/// approximate.
pub fn fn_match(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = lookup_value(&args[0])?;
    if let FormulaValue::Error(e) = &args[1] {
        return Ok(FormulaValue::Error(*e));
    }
    let grid = as_grid(&args[1]);
    let (rows, cols) = grid_dims(&grid);
    if rows > 1 && cols > 1 {
        return Err(not_found());
    }

    let mode = match int_arg(args, 2, 1)?.signum() {
        0 => MatchMode::Exact,
        1 => MatchMode::AscendingApprox,
        _ => MatchMode::DescendingApprox,
    };

    let keys: Vec<&FormulaValue> = grid.iter().flatten().collect();
    let position = find_position(value, &keys, mode).ok_or_else(not_found)?;
    Ok(FormulaValue::Number((position + 1).into()))
}

/// INDEX(array, row_num, [column_num])
///
/// With a single-row array and no column, `row_num` selects the column.
pub fn fn_index(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if let Some(e) = first_error(args) {
        return Ok(FormulaValue::Error(e));
    }

    let grid = as_grid(&args[0]);
    let (rows, cols) = grid_dims(&grid);

    let (row_num, col_num) = match args.get(2) {
        Some(_) => (int_arg(args, 1, 1)?, int_arg(args, 2, 1)?),
        None if rows == 1 && cols > 1 => (1, int_arg(args, 1, 1)?),
        None => (int_arg(args, 1, 1)?, 1),
    };
    if row_num < 1 || col_num < 1 {
        return Err(FormulaError::Type("INDEX positions start at 1".into()));
    }

    let cell = usize::try_from(row_num - 1)
        .ok()
        .zip(usize::try_from(col_num - 1).ok())
        .and_then(|(r, c)| grid.get(r).and_then(|row| row.get(c)));
    match cell {
        Some(v) => Ok(v.clone()),
        None => Err(FormulaError::InvalidReference(format!(
            "INDEX({}, {}) is outside a {}x{} array",
            row_num, col_num, rows, cols
        ))),
    }
}

/// CHOOSE(index_num, value1, [value2], ...) - evaluates only the chosen value
pub fn fn_choose(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let index = evaluate(&args[0], ctx).to_number()?.trunc();
    let choices = &args[1..];
    let chosen = index
        .to_usize()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| choices.get(i));
    match chosen {
        Some(expr) => Ok(evaluate(expr, ctx)),
        None => Err(FormulaError::Type(format!(
            "CHOOSE index {} is outside 1..{}",
            index,
            choices.len()
        ))),
    }
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

    fn num(s: &str) -> FormulaValue {
        FormulaValue::Number(s.parse::<Decimal>().unwrap())
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::Text(s.into())
    }

    const PAINT_TABLE: &str = "{\"flat\",350,25;\"eggshell\",350,32;\"satin\",325,38;\"semi-gloss\",300,45}";
    const DISCOUNTS: &str = "{1,0;3,0.05;6,0.1}";

    #[test]
    fn test_vlookup_exact_is_case_insensitive() {
        assert_eq!(eval(&format!("=VLOOKUP(\"Satin\",{},3,FALSE)", PAINT_TABLE)), num("38"));
        assert_eq!(eval(&format!("=VLOOKUP(\"EGGSHELL\",{},2,0)", PAINT_TABLE)), num("350"));
        assert_eq!(
            eval(&format!("=VLOOKUP(\"gloss\",{},2,FALSE)", PAINT_TABLE)),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_vlookup_approximate() {
        assert_eq!(eval(&format!("=VLOOKUP(1,{},2)", DISCOUNTS)), num("0"));
        assert_eq!(eval(&format!("=VLOOKUP(4,{},2)", DISCOUNTS)), num("0.05"));
        assert_eq!(eval(&format!("=VLOOKUP(6,{},2,TRUE)", DISCOUNTS)), num("0.1"));
        assert_eq!(eval(&format!("=VLOOKUP(60,{},2)", DISCOUNTS)), num("0.1"));
        assert_eq!(
            eval(&format!("=VLOOKUP(0,{},2)", DISCOUNTS)),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_approximate_ties_resolve_to_last_duplicate() {
        assert_eq!(eval("=VLOOKUP(2,{1,\"a\";2,\"b\";2,\"c\";3,\"d\"},2)"), text("c"));
        assert_eq!(eval("=MATCH(2,{1,2,2,3})"), num("3"));
    }

    #[test]
    fn test_vlookup_bad_column() {
        assert_eq!(
            eval(&format!("=VLOOKUP(1,{},3)", DISCOUNTS)),
            FormulaValue::Error(CellError::Ref)
        );
        assert_eq!(
            eval(&format!("=VLOOKUP(1,{},0)", DISCOUNTS)),
            FormulaValue::Error(CellError::Value)
        );
        assert_eq!(eval("=VLOOKUP(1/0,{1,2},2)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_hlookup() {
        assert_eq!(eval("=HLOOKUP(\"better\",{\"good\",\"better\",\"best\";1,1.15,1.35},2,FALSE)"), num("1.15"));
        assert_eq!(eval("=HLOOKUP(250,{100,200,300;\"s\",\"m\",\"l\"},2)"), text("m"));
    }

    #[test]
    fn test_match_modes() {
        assert_eq!(eval("=MATCH(\"b\",{\"a\",\"B\",\"c\"},0)"), num("2"));
        assert_eq!(eval("=MATCH(25,{10,20,30})"), num("2"));
        assert_eq!(eval("=MATCH(25,{30,20,10},-1)"), num("1"));
        assert_eq!(eval("=MATCH(5,{10,20,30})"), FormulaValue::Error(CellError::Na));
        assert_eq!(eval("=MATCH(\"x\",{10,20,30})"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_blank_lookup_value_is_not_found() {
        let na = FormulaValue::Error(CellError::Na);
        assert_eq!(eval("=MATCH(Z1,A1:A3,0)"), na);
        assert_eq!(eval("=VLOOKUP(Z1,A1:B3,2,FALSE)"), na);
        assert_eq!(eval("=HLOOKUP(Z1,A1:C2,2,FALSE)"), na);
        assert_eq!(eval("=MATCH(Z1,{1,2,3})"), na);
    }

    #[test]
    fn test_index() {
        assert_eq!(eval("=INDEX({1,2;3,4},2,1)"), num("3"));
        assert_eq!(eval("=INDEX({10,20,30},2)"), num("20"));
        assert_eq!(eval("=INDEX({10;20;30},3)"), num("30"));
        assert_eq!(eval("=INDEX({1,2;3,4},3,1)"), FormulaValue::Error(CellError::Ref));
        assert_eq!(eval("=INDEX({1,2;3,4},0,1)"), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_choose_is_lazy() {
        assert_eq!(eval_with_issue("=CHOOSE(2, 1/0, \"two\", NOSUCH())"), (text("two"), None));
        assert_eq!(eval("=CHOOSE(2.9, \"a\", \"b\")"), text("b"));
        assert_eq!(eval("=CHOOSE(3, \"a\", \"b\")"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=CHOOSE(0, \"a\")"), FormulaValue::Error(CellError::Value));
    }
}
