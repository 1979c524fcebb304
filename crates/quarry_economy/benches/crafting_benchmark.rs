//! Benchmark for recipe matching and machine feeding.
//!
//! Run with: cargo bench --package quarry_economy --bench crafting_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quarry_economy::{DeviceKind, EconomyConfig, ItemKind, RecipeBook};

fn benchmark_match_exact(c: &mut Criterion) {
    let book = RecipeBook::standard();
    let teleporter = [
        ItemKind::Shard,
        ItemKind::Metal2Block,
        ItemKind::CopperIngot,
        ItemKind::Shard,
        ItemKind::Metal2Block,
        ItemKind::Metal2Block,
        ItemKind::CopperIngot,
        ItemKind::Shard,
        ItemKind::Metal2Block,
        ItemKind::Metal2Block,
    ];
    let junk = [ItemKind::Dust; 10];

    c.bench_function("match_exact_hit", |b| {
        b.iter(|| black_box(book.match_exact(black_box(&teleporter))));
    });
    c.bench_function("match_exact_miss", |b| {
        b.iter(|| black_box(book.match_exact(black_box(&junk))));
    });
}

fn benchmark_cycle_detection(c: &mut Criterion) {
    let book = RecipeBook::standard();

    c.bench_function("cycle_detection_standard_book", |b| {
        b.iter(|| black_box(book.find_cycle()));
    });
}

fn benchmark_press_feed(c: &mut Criterion) {
    let book = RecipeBook::standard();
    let config = EconomyConfig::default();

    c.bench_function("press_feed_1000_scrap", |b| {
        b.iter(|| {
            let mut press = DeviceKind::Press.default_state();
            let mut plates = 0usize;
            if let Some(press) = press.as_mut() {
                for _ in 0..1000 {
                    plates += press.feed(ItemKind::Scrap, &book, &config).produced.len();
                }
            }
            black_box(plates)
        });
    });
}

criterion_group!(
    benches,
    benchmark_match_exact,
    benchmark_cycle_detection,
    benchmark_press_feed
);
criterion_main!(benches);
