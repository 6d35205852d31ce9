use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rf_core::{and_assign, restrict, weighted_sum};
use std::hint::black_box;

fn make_mask(n: usize, stride: usize) -> Vec<bool> {
    (0..n).map(|i| i % stride != 0).collect()
}

fn bench_mask_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("core_mask");

    for n in [10_000usize, 100_000, 1_000_000] {
        let a = make_mask(n, 3);
        let b = make_mask(n, 7);
        let w: Vec<f64> = (0..n).map(|i| 1.0 + (i % 11) as f64 * 0.01).collect();

        group.bench_with_input(BenchmarkId::new("and_assign", n), &n, |bch, _| {
            bch.iter(|| {
                let mut acc = a.clone();
                and_assign(&mut acc, &b);
                black_box(acc)
            })
        });
        group.bench_with_input(BenchmarkId::new("restrict", n), &n, |bch, _| {
            bch.iter(|| black_box(restrict(&w, &a)))
        });
        group.bench_with_input(BenchmarkId::new("weighted_sum", n), &n, |bch, _| {
            bch.iter(|| black_box(weighted_sum(&b, &w)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mask_ops);
criterion_main!(benches);
