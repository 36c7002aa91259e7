//! Multi-room estimate scaling
//!
//! Project cost should grow linearly with the number of rooms, with and
//! without the result cache.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use paintbox::prelude::*;
use rust_decimal::Decimal;

fn project(rooms: usize) -> Vec<RoomInput> {
    (0..rooms)
        .map(|i| {
            // Vary the dimensions so rooms do not share cache entries
            let length = Decimal::new(100 + i as i64, 1);
            RoomInput::new(format!("Room {}", i + 1), length, Decimal::from(11), Decimal::from(9))
                .with_openings(1 + (i % 3) as u32, (i % 4) as u32)
                .with_paint(PaintType::ALL[i % PaintType::ALL.len()], 2)
        })
        .collect()
}

fn bench_multi_room(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_room");

    for rooms in [1, 10, 50, 200] {
        let input = project(rooms);
        group.throughput(Throughput::Elements(rooms as u64));

        group.bench_with_input(BenchmarkId::new("uncached", rooms), &input, |b, input| {
            let calculator = PaintingCalculator::new(CalculatorOptions::uncached()).unwrap();
            b.iter(|| black_box(calculator.calculate_multi_room_estimate(input).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("warm_cache", rooms), &input, |b, input| {
            let calculator = PaintingCalculator::new(CalculatorOptions::default()).unwrap();
            calculator.calculate_multi_room_estimate(input).unwrap();
            b.iter(|| black_box(calculator.calculate_multi_room_estimate(input).unwrap()))
        });
    }

    group.finish();
}

fn bench_single_room(c: &mut Criterion) {
    let room = RoomInput::new("Den", Decimal::from(12), Decimal::from(10), Decimal::from(9))
        .with_openings(2, 3);
    let calculator = PaintingCalculator::new(CalculatorOptions::uncached()).unwrap();

    c.bench_function("single_room", |b| {
        b.iter(|| black_box(calculator.calculate_complete_room_estimate(black_box(&room)).unwrap()))
    });
}

criterion_group!(benches, bench_multi_room, bench_single_room);
criterion_main!(benches);
