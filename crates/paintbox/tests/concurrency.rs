//! Concurrent calculations and the shared result cache

use paintbox::prelude::*;
use paintbox::ResultCache;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

fn rooms() -> Vec<RoomInput> {
    vec![
        RoomInput::new("Kitchen", Decimal::from(14), Decimal::from(12), Decimal::from(9))
            .with_openings(2, 2)
            .with_paint(PaintType::Satin, 2),
        RoomInput::new("Bedroom", Decimal::new(115, 1), Decimal::from(11), Decimal::from(8))
            .with_openings(1, 2)
            .with_ceiling(),
        RoomInput::new("Hall", Decimal::from(20), Decimal::from(4), Decimal::from(9))
            .with_openings(4, 0)
            .with_condition(SurfaceCondition::Fair)
            .with_trim(),
    ]
}

#[test]
fn test_concurrent_room_estimates_are_identical() {
    let calculator = PaintingCalculator::new(CalculatorOptions::default()).unwrap();
    let room = rooms().remove(0);

    let results: Vec<RoomEstimate> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| calculator.calculate_complete_room_estimate(&room)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect()
    });

    let expected = PaintingCalculator::new(CalculatorOptions::uncached())
        .unwrap()
        .calculate_complete_room_estimate(&room)
        .unwrap();
    for result in &results {
        assert_eq!(result, &expected);
    }
}

#[test]
fn test_concurrent_projects_share_one_cache() {
    let cache = Arc::new(ResultCache::new(NonZeroUsize::new(1024).unwrap()));
    let rooms = rooms();

    let results: Vec<MultiRoomEstimate> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let calculator = PaintingCalculator::with_cache(
                    CalculatorOptions::default(),
                    Arc::clone(&cache),
                )
                .unwrap();
                let rooms = &rooms;
                scope.spawn(move || calculator.calculate_multi_room_estimate(rooms))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect()
    });

    for result in &results[1..] {
        assert_eq!(result, &results[0]);
    }

    // Later calculators were served from the cache
    let stats = cache.stats();
    assert!(stats.hits + stats.coalesced > 0);
}

#[test]
fn test_cache_does_not_change_results() {
    let cached = PaintingCalculator::new(CalculatorOptions::default()).unwrap();
    let uncached = PaintingCalculator::new(CalculatorOptions::uncached()).unwrap();
    let rooms = rooms();

    let reference = uncached.calculate_multi_room_estimate(&rooms).unwrap();
    // Cold, then warm
    assert_eq!(cached.calculate_multi_room_estimate(&rooms).unwrap(), reference);
    assert_eq!(cached.calculate_multi_room_estimate(&rooms).unwrap(), reference);
    assert!(cached.cache_stats().unwrap().hits > 0);
}

#[test]
fn test_changed_rates_miss_the_cache() {
    let cache = Arc::new(ResultCache::new(NonZeroUsize::new(1024).unwrap()));
    let room = rooms().remove(0);

    let standard = PaintingCalculator::with_cache(CalculatorOptions::default(), Arc::clone(&cache))
        .unwrap()
        .calculate_complete_room_estimate(&room)
        .unwrap();

    let mut options = CalculatorOptions::default();
    options.rates.markup = Decimal::new(25, 2);
    let marked_up = PaintingCalculator::with_cache(options, cache)
        .unwrap()
        .calculate_complete_room_estimate(&room)
        .unwrap();

    assert_eq!(standard.paintable_area, marked_up.paintable_area);
    assert!(marked_up.pricing.unwrap().good > standard.pricing.unwrap().good);
}
