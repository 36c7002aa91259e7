//! Built-in functions
//!
//! Every function is a pure mapping from its arguments to a value, so a cached
//! result is always interchangeable with a fresh evaluation. Nothing here reads
//! the clock, randomness or any state outside its arguments.
//!
//! Argument coercion:
//! - direct scalar arguments of numeric functions coerce the same way the
//!   arithmetic operators do (booleans, empty, numeric text)
//! - aggregates (`SUM`, `AVERAGE`, `MIN`, `MAX`, `COUNT`, `PRODUCT`) skip text,
//!   booleans and empty cells found inside ranges
//! - an error value in any consumed argument is returned as the result

pub mod criteria;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use ahash::AHashMap;
use paintbox_core::CellError;
use rust_decimal::prelude::*;

/// Function over already-evaluated arguments
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Function that evaluates its own argument expressions (short-circuiting forms)
pub type LazyImpl = fn(&[FormulaExpr], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// How a function receives its arguments
#[derive(Clone, Copy)]
pub enum Implementation {
    Eager(FunctionImpl),
    Lazy(LazyImpl),
}

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: Implementation,
}

impl FunctionDef {
    pub fn eager(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        f: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            implementation: Implementation::Eager(f),
        }
    }

    pub fn lazy(name: &'static str, min_args: usize, max_args: Option<usize>, f: LazyImpl) -> Self {
        Self {
            name,
            min_args,
            max_args,
            implementation: Implementation::Lazy(f),
        }
    }

    /// Check an argument count against this definition
    pub fn check_arity(&self, actual: usize) -> FormulaResult<()> {
        let too_few = actual < self.min_args;
        let too_many = self.max_args.map_or(false, |max| actual > max);
        if !(too_few || too_many) {
            return Ok(());
        }

        let expected = match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        };
        Err(FormulaError::ArgumentCount {
            function: self.name.to_string(),
            expected,
            actual,
        })
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_info_functions();
        registry.register_lookup_functions();
        registry.register_statistical_functions();

        registry
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        match self.functions.get(name) {
            Some(def) => Some(def),
            None => self.functions.get(name.to_uppercase().as_str()),
        }
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn register_math_functions(&mut self) {
        use math::*;

        self.register(FunctionDef::eager("SUM", 1, None, fn_sum));
        self.register(FunctionDef::eager("PRODUCT", 1, None, fn_product));
        self.register(FunctionDef::eager("SUMPRODUCT", 1, None, fn_sumproduct));
        self.register(FunctionDef::eager("AVERAGE", 1, None, fn_average));
        self.register(FunctionDef::eager("MIN", 1, None, fn_min));
        self.register(FunctionDef::eager("MAX", 1, None, fn_max));
        self.register(FunctionDef::eager("COUNT", 1, None, fn_count));
        self.register(FunctionDef::eager("ABS", 1, Some(1), fn_abs));
        self.register(FunctionDef::eager("ROUND", 2, Some(2), fn_round));
        self.register(FunctionDef::eager("ROUNDUP", 2, Some(2), fn_roundup));
        self.register(FunctionDef::eager("ROUNDDOWN", 2, Some(2), fn_rounddown));
        self.register(FunctionDef::eager("MROUND", 2, Some(2), fn_mround));
        self.register(FunctionDef::eager("CEILING", 2, Some(2), fn_ceiling));
        self.register(FunctionDef::eager("CEILING.MATH", 1, Some(3), fn_ceiling_math));
        self.register(FunctionDef::eager("FLOOR", 2, Some(2), fn_floor));
        self.register(FunctionDef::eager("FLOOR.MATH", 1, Some(3), fn_floor_math));
        self.register(FunctionDef::eager("INT", 1, Some(1), fn_int));
        self.register(FunctionDef::eager("TRUNC", 1, Some(2), fn_trunc));
        self.register(FunctionDef::eager("MOD", 2, Some(2), fn_mod));
        self.register(FunctionDef::eager("POWER", 2, Some(2), fn_power));
        self.register(FunctionDef::eager("SQRT", 1, Some(1), fn_sqrt));
        self.register(FunctionDef::eager("SIGN", 1, Some(1), fn_sign));
        self.register(FunctionDef::eager("SUMIF", 2, Some(3), fn_sumif));
    }

    fn register_logical_functions(&mut self) {
        use logical::*;

        self.register(FunctionDef::lazy("IF", 2, Some(3), fn_if));
        self.register(FunctionDef::lazy("IFS", 2, None, fn_ifs));
        self.register(FunctionDef::lazy("IFERROR", 2, Some(2), fn_iferror));
        self.register(FunctionDef::lazy("IFNA", 2, Some(2), fn_ifna));
        self.register(FunctionDef::lazy("SWITCH", 3, None, fn_switch));
        self.register(FunctionDef::eager("AND", 1, None, fn_and));
        self.register(FunctionDef::eager("OR", 1, None, fn_or));
        self.register(FunctionDef::eager("XOR", 1, None, fn_xor));
        self.register(FunctionDef::eager("NOT", 1, Some(1), fn_not));
        self.register(FunctionDef::eager("TRUE", 0, Some(0), fn_true));
        self.register(FunctionDef::eager("FALSE", 0, Some(0), fn_false));
    }

    fn register_text_functions(&mut self) {
        use text::*;

        self.register(FunctionDef::eager("CONCATENATE", 1, None, fn_concatenate));
        self.register(FunctionDef::eager("CONCAT", 1, None, fn_concat));
        self.register(FunctionDef::eager("LEN", 1, Some(1), fn_len));
        self.register(FunctionDef::eager("LEFT", 1, Some(2), fn_left));
        self.register(FunctionDef::eager("RIGHT", 1, Some(2), fn_right));
        self.register(FunctionDef::eager("MID", 3, Some(3), fn_mid));
        self.register(FunctionDef::eager("UPPER", 1, Some(1), fn_upper));
        self.register(FunctionDef::eager("LOWER", 1, Some(1), fn_lower));
        self.register(FunctionDef::eager("TRIM", 1, Some(1), fn_trim));
        self.register(FunctionDef::eager("VALUE", 1, Some(1), fn_value));
        self.register(FunctionDef::eager("TEXT", 2, Some(2), fn_text));
        self.register(FunctionDef::eager("EXACT", 2, Some(2), fn_exact));
    }

    fn register_info_functions(&mut self) {
        use info::*;

        self.register(FunctionDef::eager("ISBLANK", 1, Some(1), fn_isblank));
        self.register(FunctionDef::eager("ISNUMBER", 1, Some(1), fn_isnumber));
        self.register(FunctionDef::eager("ISTEXT", 1, Some(1), fn_istext));
        self.register(FunctionDef::eager("ISERROR", 1, Some(1), fn_iserror));
        self.register(FunctionDef::eager("ISNA", 1, Some(1), fn_isna));
        self.register(FunctionDef::eager("ISLOGICAL", 1, Some(1), fn_islogical));
        self.register(FunctionDef::eager("NA", 0, Some(0), fn_na));
        self.register(FunctionDef::eager("N", 1, Some(1), fn_n));
    }

    fn register_lookup_functions(&mut self) {
        use lookup::*;

        self.register(FunctionDef::eager("VLOOKUP", 3, Some(4), fn_vlookup));
        self.register(FunctionDef::eager("HLOOKUP", 3, Some(4), fn_hlookup));
        self.register(FunctionDef::eager("MATCH", 2, Some(3), fn_match));
        self.register(FunctionDef::eager("INDEX", 2, Some(3), fn_index));
        self.register(FunctionDef::lazy("CHOOSE", 2, None, fn_choose));
    }

    fn register_statistical_functions(&mut self) {
        use statistical::*;

        self.register(FunctionDef::eager("COUNTA", 1, None, fn_counta));
        self.register(FunctionDef::eager("COUNTIF", 2, Some(2), fn_countif));
        self.register(FunctionDef::eager("AVERAGEIF", 2, Some(3), fn_averageif));
    }
}

// ==================== Argument helpers ====================

/// Visit every value of an argument, descending into arrays
pub(crate) fn flatten(value: &FormulaValue) -> Box<dyn Iterator<Item = &FormulaValue> + '_> {
    match value {
        FormulaValue::Array(rows) => Box::new(rows.iter().flatten()),
        v => Box::new(std::iter::once(v)),
    }
}

/// Collect the numbers an aggregate sees
///
/// Direct arguments coerce; values inside ranges count only when numeric.
pub(crate) fn collect_numbers(args: &[FormulaValue]) -> FormulaResult<Vec<Decimal>> {
    let mut numbers = Vec::new();

    for arg in args {
        match arg {
            FormulaValue::Array(rows) => {
                for cell in rows.iter().flatten() {
                    match cell {
                        FormulaValue::Number(n) => numbers.push(*n),
                        FormulaValue::Error(e) => return Err(FormulaError::ErrorValue(*e)),
                        _ => {} // Ignore non-numeric
                    }
                }
            }
            FormulaValue::Empty => {}
            scalar => numbers.push(scalar.to_number()?),
        }
    }

    Ok(numbers)
}

/// Numeric argument at `index`, or `default` when it was omitted
pub(crate) fn number_arg(
    args: &[FormulaValue],
    index: usize,
    default: Decimal,
) -> FormulaResult<Decimal> {
    match args.get(index) {
        Some(v) => v.to_number(),
        None => Ok(default),
    }
}

/// Whole-number argument (truncated toward zero)
pub(crate) fn int_arg(args: &[FormulaValue], index: usize, default: i64) -> FormulaResult<i64> {
    match args.get(index) {
        Some(v) => v
            .to_number()?
            .trunc()
            .to_i64()
            .ok_or(FormulaError::ErrorValue(CellError::Num)),
        None => Ok(default),
    }
}

/// Text argument; errors propagate, ranges are rejected
pub(crate) fn text_arg(args: &[FormulaValue], index: usize) -> FormulaResult<String> {
    match args.get(index) {
        Some(FormulaValue::Error(e)) => Err(FormulaError::ErrorValue(*e)),
        Some(FormulaValue::Array(_)) => Err(FormulaError::Type(
            "Expected text, got a range".into(),
        )),
        Some(v) => Ok(v.as_string()),
        None => Ok(String::new()),
    }
}

/// View any argument as a grid; a scalar is a 1x1 grid
pub(crate) fn as_grid(value: &FormulaValue) -> Vec<Vec<FormulaValue>> {
    match value {
        FormulaValue::Array(rows) => rows.clone(),
        v => vec![vec![v.clone()]],
    }
}

/// (rows, columns) of a grid
pub(crate) fn grid_dims(grid: &[Vec<FormulaValue>]) -> (usize, usize) {
    let rows = grid.len();
    let cols = grid.first().map_or(0, |r| r.len());
    (rows, cols)
}

/// First error value among the arguments, if any
pub(crate) fn first_error(args: &[FormulaValue]) -> Option<CellError> {
    args.iter().find_map(FormulaValue::get_error)
}
