//! Calculation engine
//!
//! An [`Engine`] owns one request's worksheet data and evaluates its formula
//! cells on demand:
//!
//! 1. formulas reachable from the requested cells are parsed once and their
//!    references recorded in the [`DependencyGraph`];
//! 2. the graph yields an evaluation order with cycles split out;
//! 3. cells are evaluated in that order, each reading the memoized values of
//!    its precedents.
//!
//! Values stay memoized until an input they depend on changes. When a
//! [`ResultCache`] is attached, every formula evaluation goes through it, so
//! engines that share a cache also share work.
//!
//! # Example
//!
//! ```
//! use paintbox_core::{CellKey, CellValue, RawValue};
//! use paintbox_formula::Engine;
//!
//! let a1 = CellKey::parse("Sheet1!A1").unwrap();
//! let c1 = CellKey::parse("Sheet1!C1").unwrap();
//!
//! let mut engine = Engine::new();
//! engine.set_worksheet_data(vec![(a1, RawValue::from(100))]);
//! let value = engine.evaluate(&c1, Some("=A1*2"));
//! assert_eq!(value, CellValue::from(200));
//! ```

use crate::ast::{Formula, FormulaExpr};
use crate::cache::{CacheKey, CacheKeyBuilder, CacheStatus, CellOutcome, ResultCache};
use crate::dependency::{DependencyGraph, EvalStep};
use crate::error::FormulaError;
use crate::evaluator::{evaluate, CellSource, EvaluationContext, FormulaValue};
use ahash::{AHashMap, AHashSet};
use paintbox_core::{
    CellError, CellKey, CellValue, NamedRange, RawValue, SheetName, Workbook,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, debug_span, trace, warn};

/// Counters for one engine's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Formula texts parsed
    pub formulas_parsed: usize,
    /// Formula cells whose value was produced (computed or served by the cache)
    pub cells_evaluated: usize,
    /// Evaluations answered by the result cache
    pub cache_hits: usize,
    /// Evaluations the result cache had to compute
    pub cache_misses: usize,
}

/// Result of [`Engine::evaluate_all`]
///
/// Every requested cell has a value; failed cells additionally carry the
/// reason in `diagnostics`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub values: BTreeMap<CellKey, CellValue>,
    pub diagnostics: BTreeMap<CellKey, FormulaError>,
}

impl EvaluationReport {
    pub fn get(&self, key: &CellKey) -> Option<&CellValue> {
        self.values.get(key)
    }

    /// Whether every requested cell evaluated without error
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// A parsed formula together with the names it mentions
#[derive(Debug)]
struct Compiled {
    formula: Arc<Formula>,
    names: Vec<String>,
}

/// Per-request formula evaluation engine
#[derive(Debug, Default)]
pub struct Engine {
    workbook: Workbook,
    /// Parse results, keyed by formula cell
    formulas: AHashMap<CellKey, Result<Compiled, FormulaError>>,
    graph: DependencyGraph,
    /// Memoized formula results
    values: AHashMap<CellKey, CellOutcome>,
    cache: Option<Arc<ResultCache>>,
    stats: EngineStats,
}

impl Engine {
    /// Create an engine with an empty workbook and no cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Route formula evaluations through a shared result cache
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Bulk-load cell contents; only the given cells are overwritten
    ///
    /// Changed cells and every formula that depends on them are invalidated.
    pub fn set_worksheet_data<I, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (CellKey, V)>,
        V: Into<RawValue>,
    {
        let changed = self.workbook.set_worksheet_data(entries);
        if !changed.is_empty() {
            debug!(changed = changed.len(), "worksheet data updated");
            self.invalidate(&changed);
        }
    }

    /// Store formula text for a cell (parsed when first evaluated)
    pub fn set_formula(&mut self, key: &CellKey, text: &str) {
        if self.workbook.formula(key) == Some(text) {
            return;
        }
        self.workbook.set(key, RawValue::formula(text));
        self.invalidate(std::slice::from_ref(key));
    }

    /// Define a workbook-scoped name
    ///
    /// Names can change what any formula reads, so all parsed state is dropped.
    pub fn define_name(&mut self, name: &str, refers_to: &str) -> paintbox_core::Result<()> {
        self.workbook.define_name(name, refers_to)?;
        self.formulas.clear();
        self.graph.clear();
        self.values.clear();
        Ok(())
    }

    /// Value of one cell
    ///
    /// When `formula_text` is given it is stored at `key` first; otherwise the
    /// cell's current content is used. Never fails: problems come back as an
    /// error value, with the reason available from [`Engine::diagnostic`].
    pub fn evaluate(&mut self, key: &CellKey, formula_text: Option<&str>) -> CellValue {
        if let Some(text) = formula_text {
            self.set_formula(key, text);
        }
        if self.workbook.formula(key).is_none() {
            return self.workbook.literal(key);
        }
        self.run(std::slice::from_ref(key));
        self.cell_value(key)
    }

    /// Values of many cells, with per-cell diagnostics for the ones that failed
    pub fn evaluate_all(&mut self, keys: &[CellKey]) -> EvaluationReport {
        let _span = debug_span!("evaluate_all", cells = keys.len()).entered();
        self.run(keys);

        let mut report = EvaluationReport::default();
        for key in keys {
            report.values.insert(key.clone(), self.cell_value(key));
            if let Some(diagnostic) = self.diagnostic(key) {
                report.diagnostics.insert(key.clone(), diagnostic.clone());
            }
        }
        report
    }

    /// Why an evaluated cell holds an error value
    pub fn diagnostic(&self, key: &CellKey) -> Option<&FormulaError> {
        self.values.get(key)?.diagnostic.as_ref()
    }

    /// Drop memoized state for `changed` and everything downstream of it
    fn invalidate(&mut self, changed: &[CellKey]) {
        let downstream = self.graph.dependents_transitive(changed);
        trace!(
            changed = changed.len(),
            downstream = downstream.len(),
            "invalidating"
        );
        for key in changed {
            // The content itself changed: forget the parse and its edges
            self.formulas.remove(key);
            self.graph.clear_precedents(key);
            self.values.remove(key);
        }
        for key in &downstream {
            self.values.remove(key);
        }
    }

    /// Parse every unparsed formula reachable from `roots`
    fn prepare(&mut self, roots: &[CellKey]) {
        let mut seen = AHashSet::new();
        let mut stack: Vec<CellKey> = roots.to_vec();

        while let Some(key) = stack.pop() {
            // A memoized cell's precedents are all memoized too
            if self.values.contains_key(&key) || !seen.insert(key.clone()) {
                continue;
            }
            if !self.formulas.contains_key(&key) {
                let text: Arc<str> = match self.workbook.formula(&key) {
                    Some(text) => Arc::from(text),
                    None => continue,
                };
                let compiled = self.compile(&key, text);
                self.formulas.insert(key.clone(), compiled);
            }
            stack.extend(self.graph.get_precedents(&key).cloned());
        }
    }

    fn compile(&mut self, key: &CellKey, text: Arc<str>) -> Result<Compiled, FormulaError> {
        self.stats.formulas_parsed += 1;
        match Formula::parse(text) {
            Ok(formula) => {
                let mut references = References::default();
                references.collect(formula.ast(), &key.sheet, &self.workbook);
                self.graph.set_precedents(key, references.cells);

                let mut names: Vec<String> = references.names.into_iter().collect();
                names.sort_unstable();
                Ok(Compiled {
                    formula: Arc::new(formula),
                    names,
                })
            }
            Err(e) => {
                warn!(cell = %key, error = %e, "formula failed to parse");
                self.graph.clear_precedents(key);
                Err(e)
            }
        }
    }

    /// Evaluate every stale formula cell needed for `roots`
    fn run(&mut self, roots: &[CellKey]) {
        self.prepare(roots);

        let pending: Vec<CellKey> = roots
            .iter()
            .filter(|key| !self.values.contains_key(*key))
            .cloned()
            .collect();
        if pending.is_empty() {
            return;
        }

        for step in self.graph.evaluation_order(&pending) {
            match step {
                EvalStep::Cell(key) => {
                    if self.values.contains_key(&key) {
                        continue;
                    }
                    let (outcome, status) = match self.formulas.get(&key) {
                        Some(Ok(compiled)) => self.compute(&key, compiled),
                        Some(Err(e)) => (CellOutcome::failed(e.clone()), None),
                        // Literal cell
                        None => continue,
                    };
                    self.record(key, outcome, status);
                }
                EvalStep::Cycle(members) => {
                    let names = members
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    warn!(cells = %names, "circular reference");
                    for key in members {
                        if !self.values.contains_key(&key) {
                            let error = FormulaError::CircularReference(names.clone());
                            self.record(key, CellOutcome::failed(error), None);
                        }
                    }
                }
            }
        }
    }

    fn record(&mut self, key: CellKey, outcome: CellOutcome, status: Option<CacheStatus>) {
        self.stats.cells_evaluated += 1;
        match status {
            Some(CacheStatus::Miss) => self.stats.cache_misses += 1,
            Some(CacheStatus::Hit | CacheStatus::Coalesced) => self.stats.cache_hits += 1,
            None => {}
        }
        trace!(cell = %key, value = %outcome.value, "evaluated");
        self.values.insert(key, outcome);
    }

    fn compute(&self, key: &CellKey, compiled: &Compiled) -> (CellOutcome, Option<CacheStatus>) {
        match &self.cache {
            Some(cache) => {
                let cache_key = self.cache_key(key, compiled);
                let (outcome, status) = cache
                    .get_or_compute(cache_key, || self.evaluate_formula(key, &compiled.formula));
                (outcome, Some(status))
            }
            None => (self.evaluate_formula(key, &compiled.formula), None),
        }
    }

    /// Hash of the formula text, its names and the current value of every precedent
    fn cache_key(&self, key: &CellKey, compiled: &Compiled) -> CacheKey {
        let mut builder = CacheKeyBuilder::new(compiled.formula.text());
        for name in &compiled.names {
            builder.name(name, self.workbook.named_range(name).map(|n| &n.target));
        }

        let mut precedents: Vec<&CellKey> = self.graph.get_precedents(key).collect();
        precedents.sort_unstable();
        for precedent in precedents {
            let value = if self.workbook.has_sheet(&precedent.sheet) {
                self.cell_value(precedent)
            } else {
                CellValue::Error(CellError::Ref)
            };
            builder.dependency(precedent, &value);
        }
        builder.finish()
    }

    fn evaluate_formula(&self, key: &CellKey, formula: &Formula) -> CellOutcome {
        trace!(cell = %key, formula = formula.text(), "computing");
        let ctx = EvaluationContext::new(self, key.sheet.clone());

        let value = match evaluate(formula.ast(), &ctx) {
            FormulaValue::Array(rows) if rows.len() != 1 || rows[0].len() != 1 => ctx.fail(
                FormulaError::Type("Formula returned more than one value".into()),
            ),
            // A formula that reads an empty cell shows 0
            FormulaValue::Empty => FormulaValue::Number(Decimal::ZERO),
            value => value,
        };
        let issue = ctx.take_issue();

        match CellValue::from(value) {
            CellValue::Error(error) => {
                let diagnostic = match issue {
                    Some(issue) if issue.cell_error() == error => issue,
                    _ => FormulaError::ErrorValue(error),
                };
                CellOutcome {
                    value: CellValue::Error(error),
                    diagnostic: Some(diagnostic),
                }
            }
            value => CellOutcome::ok(value),
        }
    }
}

/// Formula cells read their memoized result; everything else its literal.
impl CellSource for Engine {
    fn cell_value(&self, key: &CellKey) -> CellValue {
        match self.values.get(key) {
            Some(outcome) => outcome.value.clone(),
            None => self.workbook.literal(key),
        }
    }

    fn has_sheet(&self, sheet: &SheetName) -> bool {
        self.workbook.has_sheet(sheet)
    }

    fn named_range(&self, name: &str) -> Option<&NamedRange> {
        self.workbook.named_range(name)
    }
}

/// Cells and names a formula reads
#[derive(Default)]
struct References {
    cells: AHashSet<CellKey>,
    names: AHashSet<String>,
}

impl References {
    fn collect(&mut self, expr: &FormulaExpr, current_sheet: &SheetName, workbook: &Workbook) {
        match expr {
            FormulaExpr::CellRef(cell_ref) => {
                let sheet = cell_ref.sheet.as_ref().unwrap_or(current_sheet);
                self.cells
                    .insert(CellKey::new(sheet.clone(), cell_ref.address));
            }
            FormulaExpr::RangeRef(range_ref) => {
                let sheet = range_ref.sheet.as_ref().unwrap_or(current_sheet);
                self.cells.extend(
                    range_ref
                        .range
                        .cells()
                        .map(|address| CellKey::new(sheet.clone(), address)),
                );
            }
            FormulaExpr::NameRef(name) => {
                if let Some(named) = workbook.named_range(name) {
                    self.cells.extend(named.cells());
                }
                self.names.insert(name.to_ascii_uppercase());
            }
            FormulaExpr::BinaryOp { left, right, .. } => {
                self.collect(left, current_sheet, workbook);
                self.collect(right, current_sheet, workbook);
            }
            FormulaExpr::UnaryOp { operand, .. } => {
                self.collect(operand, current_sheet, workbook);
            }
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    self.collect(arg, current_sheet, workbook);
                }
            }
            FormulaExpr::Array(rows) => {
                for item in rows.iter().flatten() {
                    self.collect(item, current_sheet, workbook);
                }
            }
            FormulaExpr::Number(_)
            | FormulaExpr::Text(_)
            | FormulaExpr::Boolean(_)
            | FormulaExpr::Error(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::num::NonZeroUsize;

    fn key(s: &str) -> CellKey {
        CellKey::parse(s).unwrap()
    }

    fn num(n: i64) -> CellValue {
        CellValue::from(n)
    }

    fn seeded(cells: &[(&str, &str)]) -> Engine {
        let mut engine = Engine::new();
        engine.set_worksheet_data(
            cells
                .iter()
                .map(|(k, v)| (key(k), RawValue::from_input(v))),
        );
        engine
    }

    #[test]
    fn test_literal_cells_evaluate_to_themselves() {
        let mut engine = seeded(&[("S!A1", "12.5"), ("S!A2", "flat")]);
        assert_eq!(
            engine.evaluate(&key("S!A1"), None),
            CellValue::Number(Decimal::new(125, 1))
        );
        assert_eq!(engine.evaluate(&key("S!A2"), None), CellValue::from("flat"));
        assert_eq!(engine.evaluate(&key("S!A3"), None), CellValue::Empty);
        assert_eq!(engine.stats().cells_evaluated, 0);
    }

    #[test]
    fn test_chain() {
        let mut engine = seeded(&[
            ("S!A1", "5"),
            ("S!A2", "=A1*2"),
            ("S!A3", "=A2+10"),
            ("S!A4", "=A3*A1"),
        ]);
        assert_eq!(engine.evaluate(&key("S!A4"), None), num(100));
        assert_eq!(engine.stats().formulas_parsed, 3);
        assert_eq!(engine.stats().cells_evaluated, 3);

        // Memoized: nothing recomputed
        assert_eq!(engine.evaluate(&key("S!A4"), None), num(100));
        assert_eq!(engine.stats().cells_evaluated, 3);
    }

    #[test]
    fn test_reference_to_empty_cell_reads_zero() {
        let mut engine = Engine::new();
        assert_eq!(engine.evaluate(&key("S!B1"), Some("=A1")), num(0));
    }

    #[test]
    fn test_input_change_recomputes_only_dependents() {
        let mut engine = seeded(&[
            ("S!A1", "1"),
            ("S!B1", "2"),
            ("S!A2", "=A1*10"),
            ("S!B2", "=B1*10"),
            ("S!C1", "=A2+B2"),
        ]);
        let report = engine.evaluate_all(&[key("S!C1")]);
        assert_eq!(report.get(&key("S!C1")), Some(&num(30)));
        assert_eq!(engine.stats().cells_evaluated, 3);

        engine.set_worksheet_data(vec![(key("S!A1"), RawValue::from(4))]);
        assert_eq!(engine.evaluate(&key("S!C1"), None), num(60));
        // A2 and C1 recomputed, B2 kept
        assert_eq!(engine.stats().cells_evaluated, 5);
        assert_eq!(engine.stats().formulas_parsed, 3);

        // Writing the same value again invalidates nothing
        engine.set_worksheet_data(vec![(key("S!A1"), RawValue::from(4))]);
        engine.evaluate(&key("S!C1"), None);
        assert_eq!(engine.stats().cells_evaluated, 5);
    }

    #[test]
    fn test_changed_formula_text_is_reparsed() {
        let mut engine = seeded(&[("S!A1", "3"), ("S!B1", "=A1+1"), ("S!C1", "=B1*2")]);
        assert_eq!(engine.evaluate(&key("S!C1"), None), num(8));

        assert_eq!(engine.stats().formulas_parsed, 2);

        assert_eq!(engine.evaluate(&key("S!B1"), Some("=A1+2")), num(5));
        assert_eq!(engine.stats().formulas_parsed, 3);

        // C1 is recomputed from its kept parse
        let evaluated = engine.stats().cells_evaluated;
        assert_eq!(engine.evaluate(&key("S!C1"), None), num(10));
        assert_eq!(engine.stats().formulas_parsed, 3);
        assert_eq!(engine.stats().cells_evaluated, evaluated + 1);

        // Same text: no reparse
        engine.evaluate(&key("S!B1"), Some("=A1+2"));
        assert_eq!(engine.stats().formulas_parsed, 3);
    }

    #[test]
    fn test_errors_propagate_with_diagnostics() {
        let mut engine = seeded(&[
            ("S!A1", "10"),
            ("S!B1", "0"),
            ("S!C1", "=A1/B1"),
            ("S!D1", "=C1*2"),
            ("S!E1", "=IFERROR(C1, -1)"),
        ]);
        let report = engine.evaluate_all(&[key("S!C1"), key("S!D1"), key("S!E1")]);

        let div0 = CellValue::Error(CellError::Div0);
        assert_eq!(report.get(&key("S!C1")), Some(&div0));
        assert_eq!(report.get(&key("S!D1")), Some(&div0));
        assert_eq!(report.get(&key("S!E1")), Some(&num(-1)));

        assert_eq!(
            report.diagnostics.get(&key("S!C1")),
            Some(&FormulaError::DivisionByZero)
        );
        assert_eq!(
            report.diagnostics.get(&key("S!D1")),
            Some(&FormulaError::Propagated {
                cell: "S!C1".into(),
                error: CellError::Div0
            })
        );
        assert!(!report.diagnostics.contains_key(&key("S!E1")));
        assert!(!report.is_success());
    }

    #[test]
    fn test_caught_error_is_not_the_diagnostic() {
        let mut engine = seeded(&[
            ("S!A1", "10"),
            ("S!B1", "=A1/0"),
            ("S!C1", "=IFERROR(A1/0, 0)+B1"),
            ("S!D1", "=IFERROR(1/0, A1/0)"),
        ]);
        let report = engine.evaluate_all(&[key("S!C1"), key("S!D1")]);

        assert_eq!(report.get(&key("S!C1")), Some(&CellValue::Error(CellError::Div0)));
        assert_eq!(
            report.diagnostics.get(&key("S!C1")),
            Some(&FormulaError::Propagated {
                cell: "S!B1".into(),
                error: CellError::Div0
            })
        );
        assert_eq!(
            report.diagnostics.get(&key("S!D1")),
            Some(&FormulaError::DivisionByZero)
        );
    }

    #[test]
    fn test_cycle_reports_every_member() {
        let mut engine = seeded(&[
            ("S!A1", "=B1+1"),
            ("S!B1", "=C1+1"),
            ("S!C1", "=A1+1"),
            ("S!D1", "=A1*2"),
            ("S!E1", "7"),
            ("S!F1", "=E1+1"),
        ]);
        let keys = [key("S!A1"), key("S!B1"), key("S!C1"), key("S!D1"), key("S!F1")];
        let report = engine.evaluate_all(&keys);

        for cell in &keys[..3] {
            assert_eq!(
                report.get(cell),
                Some(&CellValue::Error(CellError::Circular))
            );
            assert_eq!(
                report.diagnostics.get(cell),
                Some(&FormulaError::CircularReference("S!A1, S!B1, S!C1".into()))
            );
        }
        // Downstream of the cycle: the error propagates
        assert_eq!(
            report.get(&key("S!D1")),
            Some(&CellValue::Error(CellError::Circular))
        );
        // Unrelated cells still evaluate
        assert_eq!(report.get(&key("S!F1")), Some(&num(8)));
    }

    #[test]
    fn test_self_reference() {
        let mut engine = Engine::new();
        assert_eq!(
            engine.evaluate(&key("S!A1"), Some("=A1+1")),
            CellValue::Error(CellError::Circular)
        );
    }

    #[test]
    fn test_parse_failure_is_partial() {
        let mut engine = seeded(&[("S!A1", "=SUM(1,"), ("S!B1", "=A1+1"), ("S!C1", "=2+2")]);
        let report = engine.evaluate_all(&[key("S!A1"), key("S!B1"), key("S!C1")]);

        assert_eq!(
            report.get(&key("S!A1")),
            Some(&CellValue::Error(CellError::Parse))
        );
        assert!(matches!(
            report.diagnostics.get(&key("S!A1")),
            Some(FormulaError::Parse { .. })
        ));
        assert_eq!(
            report.get(&key("S!B1")),
            Some(&CellValue::Error(CellError::Parse))
        );
        assert_eq!(report.get(&key("S!C1")), Some(&num(4)));
    }

    #[test]
    fn test_named_ranges() {
        let mut engine = seeded(&[
            ("Rates!B2", "21"),
            ("Rates!A8", "1"),
            ("Rates!A9", "2"),
            ("Room!B5", "2"),
        ]);
        engine.define_name("DOOR_AREA", "Rates!$B$2").unwrap();
        engine.define_name("STEPS", "Rates!A8:A9").unwrap();
        engine.define_name("MARKUP", "1.5").unwrap();

        assert_eq!(
            engine.evaluate(&key("Room!D5"), Some("=B5*DOOR_AREA*MARKUP")),
            num(63)
        );
        assert_eq!(engine.evaluate(&key("Room!D6"), Some("=SUM(STEPS)")), num(3));

        // Names are precedents
        engine.set_worksheet_data(vec![(key("Rates!B2"), RawValue::from(20))]);
        assert_eq!(engine.evaluate(&key("Room!D5"), None), num(60));
    }

    #[test]
    fn test_unknown_sheet_is_ref_error() {
        let mut engine = Engine::new();
        engine.set_worksheet_data(vec![(key("Room!A1"), RawValue::from(1))]);
        assert_eq!(
            engine.evaluate(&key("Room!B1"), Some("=Nowhere!A1+1")),
            CellValue::Error(CellError::Ref)
        );
        assert!(matches!(
            engine.diagnostic(&key("Room!B1")),
            Some(FormulaError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_multi_cell_result_is_value_error() {
        let mut engine = Engine::new();
        assert_eq!(
            engine.evaluate(&key("S!A1"), Some("={1,2}")),
            CellValue::Error(CellError::Value)
        );
        assert_eq!(engine.evaluate(&key("S!A2"), Some("={7}")), num(7));
    }

    #[test]
    fn test_shared_cache_serves_second_engine() {
        let cache = Arc::new(ResultCache::new(NonZeroUsize::new(64).unwrap()));
        let cells = [("S!A1", "6"), ("S!A2", "=A1*7"), ("S!A3", "=A2/0")];

        let mut first = seeded(&cells).with_cache(Arc::clone(&cache));
        let first_report = first.evaluate_all(&[key("S!A2"), key("S!A3")]);
        assert_eq!(first.stats().cache_misses, 2);

        let mut second = seeded(&cells).with_cache(Arc::clone(&cache));
        let second_report = second.evaluate_all(&[key("S!A2"), key("S!A3")]);
        assert_eq!(second.stats().cache_hits, 2);
        assert_eq!(second.stats().cache_misses, 0);

        assert_eq!(first_report, second_report);

        let mut uncached = seeded(&cells);
        assert_eq!(uncached.evaluate_all(&[key("S!A2"), key("S!A3")]), first_report);
    }

    #[test]
    fn test_cache_key_tracks_inputs() {
        let cache = Arc::new(ResultCache::new(NonZeroUsize::new(64).unwrap()));
        let mut engine = seeded(&[("S!A1", "1"), ("S!B1", "=A1+1")]).with_cache(cache);
        assert_eq!(engine.evaluate(&key("S!B1"), None), num(2));

        engine.set_worksheet_data(vec![(key("S!A1"), RawValue::from(5))]);
        assert_eq!(engine.evaluate(&key("S!B1"), None), num(6));
        assert_eq!(engine.stats().cache_misses, 2);

        // Back to the first input: served from the cache
        engine.set_worksheet_data(vec![(key("S!A1"), RawValue::from(1))]);
        assert_eq!(engine.evaluate(&key("S!B1"), None), num(2));
        assert_eq!(engine.stats().cache_hits, 1);
    }
}
