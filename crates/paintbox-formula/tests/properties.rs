//! Property tests: printing round trips, determinism, cycles and caching

use paintbox_core::{CellAddress, CellError, CellKey, CellRange, CellValue, RawValue, SheetName};
use paintbox_formula::ast::Anchors;
use paintbox_formula::{
    parse_formula, BinaryOperator, CellReference, Engine, FormulaExpr, RangeReference,
    ResultCache, UnaryOperator,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::num::NonZeroUsize;
use std::sync::Arc;

fn arb_sheet() -> impl Strategy<Value = Option<SheetName>> {
    prop_oneof![
        3 => Just(None),
        1 => prop::sample::select(vec!["Rates", "Room Data", "O'Brien", "Mike's Den"])
            .prop_map(|name| Some(SheetName::new(name).unwrap())),
    ]
}

fn arb_anchors() -> impl Strategy<Value = Anchors> {
    (any::<bool>(), any::<bool>()).prop_map(|(col, row)| Anchors { col, row })
}

fn arb_cell_ref() -> impl Strategy<Value = FormulaExpr> {
    (arb_sheet(), 0u32..200, 0u16..30, arb_anchors()).prop_map(|(sheet, row, col, anchors)| {
        FormulaExpr::CellRef(CellReference {
            sheet,
            address: CellAddress::new(row, col),
            anchors,
        })
    })
}

fn arb_range_ref() -> impl Strategy<Value = FormulaExpr> {
    (
        arb_sheet(),
        0u32..100,
        0u32..5,
        0u16..10,
        0u16..3,
        arb_anchors(),
        arb_anchors(),
    )
        .prop_map(|(sheet, row, rows, col, cols, start_anchors, end_anchors)| {
            FormulaExpr::RangeRef(RangeReference {
                sheet,
                range: CellRange::from_indices(row, col, row + rows, col + cols),
                start_anchors,
                end_anchors,
            })
        })
}

fn arb_leaf() -> impl Strategy<Value = FormulaExpr> {
    prop_oneof![
        (0i64..1_000_000, 0u32..4).prop_map(|(m, s)| FormulaExpr::Number(Decimal::new(m, s))),
        "[a-z \"]{0,6}".prop_map(FormulaExpr::Text),
        any::<bool>().prop_map(FormulaExpr::Boolean),
        prop::sample::select(vec![CellError::Div0, CellError::Na, CellError::Value])
            .prop_map(FormulaExpr::Error),
        arb_cell_ref(),
        arb_range_ref(),
        prop::sample::select(vec!["DOOR_AREA", "LABOR_RATE", "Paint_Table"])
            .prop_map(|name| FormulaExpr::NameRef(name.to_string())),
    ]
}

fn arb_binary_op() -> impl Strategy<Value = BinaryOperator> {
    prop::sample::select(vec![
        BinaryOperator::Add,
        BinaryOperator::Subtract,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Power,
        BinaryOperator::Equal,
        BinaryOperator::NotEqual,
        BinaryOperator::LessThan,
        BinaryOperator::LessEqual,
        BinaryOperator::GreaterThan,
        BinaryOperator::GreaterEqual,
        BinaryOperator::Concat,
    ])
}

fn arb_expr() -> impl Strategy<Value = FormulaExpr> {
    arb_leaf().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (arb_binary_op(), inner.clone(), inner.clone()).prop_map(|(op, left, right)| {
                FormulaExpr::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }),
            (
                prop::sample::select(vec![UnaryOperator::Negate, UnaryOperator::Percent]),
                inner.clone()
            )
                .prop_map(|(op, operand)| FormulaExpr::UnaryOp {
                    op,
                    operand: Box::new(operand),
                }),
            (
                prop::sample::select(vec!["SUM", "IF", "ROUND", "CEILING.MATH"]),
                prop::collection::vec(inner, 1..4)
            )
                .prop_map(|(name, args)| FormulaExpr::Function {
                    name: name.to_string(),
                    args,
                }),
        ]
    })
}

/// Arithmetic over A1..A4 that always parses
fn arb_arithmetic() -> impl Strategy<Value = String> {
    let operand = prop_oneof![
        prop::sample::select(vec!["A1", "A2", "A3", "A4"]).prop_map(str::to_string),
        (0u32..50).prop_map(|n| n.to_string()),
    ];
    (
        operand.clone(),
        prop::collection::vec(
            (prop::sample::select(vec!["+", "-", "*", "/", ">", "&"]), operand),
            1..6,
        ),
    )
        .prop_map(|(first, rest)| {
            let mut text = format!("={}", first);
            for (op, operand) in rest {
                text.push_str(op);
                text.push_str(&operand);
            }
            text
        })
}

fn seeded_engine(inputs: &[i64], formulas: &[String]) -> Engine {
    let mut engine = Engine::new();
    let mut cells: Vec<(CellKey, RawValue)> = inputs
        .iter()
        .enumerate()
        .map(|(i, v)| (cell("A", i + 1), RawValue::from(*v)))
        .collect();
    cells.extend(
        formulas
            .iter()
            .enumerate()
            .map(|(i, text)| (cell("B", i + 1), RawValue::formula(text))),
    );
    engine.set_worksheet_data(cells);
    engine
}

fn cell(column: &str, row: usize) -> CellKey {
    CellKey::parse(&format!("Sheet1!{}{}", column, row)).unwrap()
}

/// Whether some cycle is reachable from `root` in an adjacency list
fn reaches_cycle(edges: &[Vec<usize>], root: usize) -> bool {
    // 0 = unvisited, 1 = on the current path, 2 = done
    fn visit(edges: &[Vec<usize>], node: usize, state: &mut [u8]) -> bool {
        state[node] = 1;
        for &next in &edges[node] {
            let current = state[next];
            match current {
                1 => return true,
                0 if visit(edges, next, state) => return true,
                _ => {}
            }
        }
        state[node] = 2;
        false
    }
    let mut state = vec![0u8; edges.len()];
    visit(edges, root, &mut state)
}

proptest! {
    #[test]
    fn prop_print_then_parse_is_identity(expr in arb_expr()) {
        let text = expr.to_string();
        let reparsed = parse_formula(&text);
        prop_assert_eq!(reparsed, Ok(expr), "canonical text: {}", text);
    }

    #[test]
    fn prop_parse_is_deterministic(text in arb_arithmetic()) {
        prop_assert_eq!(parse_formula(&text), parse_formula(&text));
    }

    #[test]
    fn prop_evaluation_is_deterministic(
        inputs in prop::collection::vec(-1000i64..1000, 4),
        formulas in prop::collection::vec(arb_arithmetic(), 1..5),
    ) {
        let keys: Vec<CellKey> = (1..=formulas.len()).map(|row| cell("B", row)).collect();
        let first = seeded_engine(&inputs, &formulas).evaluate_all(&keys);
        let second = seeded_engine(&inputs, &formulas).evaluate_all(&keys);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_cache_never_changes_results(
        inputs in prop::collection::vec(-1000i64..1000, 4),
        formulas in prop::collection::vec(arb_arithmetic(), 1..5),
    ) {
        let keys: Vec<CellKey> = (1..=formulas.len()).map(|row| cell("B", row)).collect();
        let cache = Arc::new(ResultCache::new(NonZeroUsize::new(16).unwrap()));

        let plain = seeded_engine(&inputs, &formulas).evaluate_all(&keys);
        let cold = seeded_engine(&inputs, &formulas)
            .with_cache(Arc::clone(&cache))
            .evaluate_all(&keys);
        let warm = seeded_engine(&inputs, &formulas)
            .with_cache(cache)
            .evaluate_all(&keys);

        prop_assert_eq!(&plain, &cold);
        prop_assert_eq!(&plain, &warm);
    }

    #[test]
    fn prop_cycles_are_reported_iff_reachable(
        edges in prop::collection::vec(prop::collection::vec(0usize..6, 0..3), 6),
    ) {
        // Cell B(i+1) sums the cells it points at, plus one
        let formulas: Vec<String> = edges
            .iter()
            .map(|targets| {
                let refs: Vec<String> = targets.iter().map(|t| format!("B{}", t + 1)).collect();
                if refs.is_empty() {
                    "=1".to_string()
                } else {
                    format!("=1+SUM({})", refs.join(","))
                }
            })
            .collect();
        let mut engine = seeded_engine(&[], &formulas);
        let value = engine.evaluate(&cell("B", 1), None);

        if reaches_cycle(&edges, 0) {
            prop_assert_eq!(value, CellValue::Error(CellError::Circular));
        } else {
            prop_assert!(matches!(value, CellValue::Number(_)), "got {:?}", value);
        }
    }
}
