use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rf_hist::{Axis, HistogramSchema, Storage};
use rf_select::{
    BatchContext, EventMode, FillPlan, FillSpec, RegionCatalog, aggregate_channel,
};
use std::hint::black_box;

fn context(n: usize) -> BatchContext {
    let mut ctx = BatchContext::new(n, EventMode::Simulated);
    for (name, stride) in [("trigger_ele", 3usize), ("lumi", 17), ("two_bjets", 5), ("one_lepton", 7)] {
        ctx.selections.register(name, (0..n).map(|i| i % stride != 0).collect()).unwrap();
    }
    for (k, name) in ["genweight", "pileup", "btagSF", "electronID", "electronTrigger"].iter().enumerate() {
        let w = (0..n).map(|i| 1.0 + ((i + k) % 13) as f64 * 0.01).collect();
        ctx.weights.add(*name, w, None, None).unwrap();
    }
    ctx.add_quantity("met", (0..n).map(|i| (i % 400) as f64 + 25.0).collect()).unwrap();
    ctx
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_aggregate");

    let catalog = RegionCatalog::builder()
        .region(
            "ele",
            "denominator",
            vec!["lumi", "two_bjets", "one_lepton"],
            vec!["genweight", "pileup", "btagSF", "electronID"],
        )
        .region(
            "ele",
            "numerator",
            vec!["trigger_ele", "lumi", "two_bjets", "one_lepton"],
            vec!["genweight", "pileup", "btagSF", "electronID", "electronTrigger"],
        )
        .build()
        .unwrap();
    let schema = HistogramSchema::new()
        .histogram(
            "met_kin",
            Storage::Weight,
            vec![Axis::variable("met", "MET [GeV]", vec![50.0, 75.0, 100.0, 125.0, 150.0, 175.0, 200.0, 300.0, 500.0])],
        )
        .unwrap();
    let plan = FillPlan::new().fill(FillSpec::new("met_kin").column("met"));

    for n in [10_000usize, 100_000, 1_000_000] {
        let ctx = context(n);
        group.bench_with_input(BenchmarkId::new("cutflow", n), &n, |bch, _| {
            bch.iter(|| black_box(ctx.selections.cutflow(ctx.selections.names(), Some(ctx.weights.total())).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("channel", n), &n, |bch, _| {
            bch.iter(|| {
                let mut sinks = schema.build();
                aggregate_channel(&ctx, &catalog, "ele", &plan, &mut sinks).unwrap();
                black_box(sinks)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
