//! # paintbox-formula
//!
//! Formula engine for the paintbox estimate sheets.
//!
//! This crate provides:
//! - Formula parsing (text → AST) and canonical re-serialization
//! - Expression evaluation in exact decimal arithmetic
//! - The built-in function library
//! - Dependency tracking, cycle detection and the per-request [`Engine`]
//! - A shared, thread-safe [`ResultCache`]
//!
//! ## Example
//!
//! ```rust
//! use paintbox_formula::{evaluate, parse_formula, EvaluationContext, FormulaValue};
//! use rust_decimal::Decimal;
//!
//! let ast = parse_formula("=ROUND(309/350*2, 0)").unwrap();
//! let ctx = EvaluationContext::simple();
//! assert_eq!(evaluate(&ast, &ctx), FormulaValue::Number(Decimal::from(2)));
//! ```

pub mod ast;
pub mod cache;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOperator, CellReference, Formula, FormulaExpr, RangeReference, UnaryOperator};
pub use cache::{CacheKey, CacheKeyBuilder, CacheStats, CacheStatus, CellOutcome, ResultCache};
pub use dependency::{DependencyGraph, EvalStep};
pub use engine::{Engine, EngineStats, EvaluationReport};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, CellSource, EvaluationContext, FormulaValue};
pub use functions::FunctionRegistry;
pub use parser::parse_formula;
