//! Property tests over generated rooms

use paintbox::prelude::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn arb_room() -> impl Strategy<Value = RoomInput> {
    (
        (40i64..400, 40i64..400, 70i64..140),
        (0u32..4, 0u32..6),
        prop::sample::select(SurfaceCondition::ALL.to_vec()),
        prop::sample::select(PaintType::ALL.to_vec()),
        1u32..4,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |((length, width, height), (doors, windows), condition, paint, coats, ceiling, trim)| {
                // Tenths of a foot
                let mut room = RoomInput::new(
                    "Generated",
                    Decimal::new(length, 1),
                    Decimal::new(width, 1),
                    Decimal::new(height, 1),
                )
                .with_openings(doors, windows)
                .with_condition(condition)
                .with_paint(paint, coats);
                room.include_ceiling = ceiling;
                room.include_trim = trim;
                room
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_tiers_are_strictly_ascending(room in arb_room()) {
        let calculator = PaintingCalculator::new(CalculatorOptions::uncached()).unwrap();
        let estimate = calculator.calculate_complete_room_estimate(&room).unwrap();

        prop_assert!(estimate.is_complete(), "failures: {:?}", estimate.failures);
        let pricing = estimate.pricing.unwrap();
        prop_assert!(pricing.good < pricing.better, "{:?}", pricing);
        prop_assert!(pricing.better < pricing.best, "{:?}", pricing);
    }

    #[test]
    fn prop_cache_is_transparent(rooms in prop::collection::vec(arb_room(), 1..4)) {
        let cached = PaintingCalculator::new(CalculatorOptions::default()).unwrap();
        let uncached = PaintingCalculator::new(CalculatorOptions::uncached()).unwrap();

        let expected = uncached.calculate_multi_room_estimate(&rooms).unwrap();
        prop_assert_eq!(&cached.calculate_multi_room_estimate(&rooms).unwrap(), &expected);
        prop_assert_eq!(&cached.calculate_multi_room_estimate(&rooms).unwrap(), &expected);
    }

    #[test]
    fn prop_paint_covers_every_coat(room in arb_room()) {
        let calculator = PaintingCalculator::new(CalculatorOptions::uncached()).unwrap();
        let estimate = calculator.calculate_complete_room_estimate(&room).unwrap();
        let coverage = calculator
            .options()
            .rates
            .paint(room.paint_type)
            .map(|p| p.coverage_sqft)
            .unwrap();

        let area = estimate.paintable_area.unwrap();
        let gallons = estimate.gallons.unwrap();
        let needed = area * Decimal::from(room.coats);
        prop_assert!(gallons * coverage >= needed);
        prop_assert!(gallons.is_zero() || (gallons - Decimal::ONE) * coverage < needed);
    }
}
