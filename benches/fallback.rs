use chartwise::analysis::{fallback, profile};
use chartwise::dataset::{Column, Dataset};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sales_dataset(rows: i64) -> Dataset {
    Dataset::new(vec![
        Column::text("region", (0..rows).map(|i| format!("region-{}", i % 40))),
        Column::text("product", (0..rows).map(|i| format!("sku-{}", i % 7))),
        Column::int("units", (0..rows).map(|i| i % 13)),
        Column::float("revenue", (0..rows).map(|i| (i % 101) as f64 * 1.25)),
    ])
    .expect("columns have equal length")
}

fn bench_fallback(c: &mut Criterion) {
    let dataset = sales_dataset(100_000);

    c.bench_function("profile_100k", |b| b.iter(|| profile(black_box(&dataset))));

    let profiled = profile(&dataset).expect("non-empty dataset");
    c.bench_function("fallback_100k", |b| b.iter(|| fallback(black_box(&profiled))));
}

criterion_group!(benches, bench_fallback);
criterion_main!(benches);
