//! Despiking and full-pipeline throughput benchmark
//!
//! One hour of 20 Hz data is 72 000 samples per channel. The benchmarks
//! measure a single despiked channel, the four-channel fan-out with and
//! without worker threads, and the complete process + calculate chain.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench despike_throughput
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use remolino::bins::{BinLayout, BinSet};
use remolino::filter::ChannelStage;
use remolino::{ChannelSet, NoopReporter, Pipeline, PipelineConfig, SigmaDespiker};

const HZ: usize = 20;

/// `seconds` of noisy 20 Hz wind and temperature with sparse spikes
fn record(seconds: usize) -> ChannelSet {
    let n = seconds * HZ;
    let mut rng = StdRng::seed_from_u64(42);
    let index: Vec<f64> = (0..n).map(|i| i as f64 / HZ as f64).collect();
    let mut channel = |base: f64, scale: f64| -> Vec<f64> {
        (0..n)
            .map(|_| {
                let spike = if rng.gen_bool(0.001) { 8.0 * scale } else { 0.0 };
                base + scale * rng.gen_range(-1.0..1.0) + spike
            })
            .collect()
    };
    let u = channel(4.0, 1.0);
    let v = channel(1.0, 0.5);
    let w = channel(0.1, 0.2);
    let t = channel(15.0, 0.3);
    ChannelSet::from_columns(index, [("u", u), ("v", v), ("w", w), ("t", t)])
        .expect("synthetic record is well formed")
}

fn layout(set: &ChannelSet, period: f64) -> BinLayout {
    let stop = set.len() as f64 / HZ as f64;
    let bins = BinSet::new(0.0, stop, period).expect("valid bins");
    BinLayout::resolve(&bins, set.index())
}

/// Benchmark: one channel, varying record length
fn bench_despike_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("despike_channel");
    for minutes in [10usize, 30, 60] {
        let set = record(minutes * 60);
        let layout = layout(&set, 600.0);
        let despiker = SigmaDespiker::new(3.5, HZ, 10).expect("valid despiker");
        let values = set.values("u").expect("u exists").to_vec();

        group.throughput(Throughput::Elements(values.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(minutes), &values, |b, values| {
            b.iter(|| {
                let mut work = values.clone();
                black_box(despiker.despike("u", &mut work, &layout, &NoopReporter))
            });
        });
    }
    group.finish();
}

/// Benchmark: sequential vs scoped-thread fan-out over four channels
fn bench_despike_fan_out(c: &mut Criterion) {
    let set = record(3600);
    let layout = layout(&set, 1800.0);
    let despiker = SigmaDespiker::new(3.5, HZ, 10).expect("valid despiker");

    let mut group = c.benchmark_group("despike_fan_out");
    group.throughput(Throughput::Elements((set.len() * 4) as u64));
    group.bench_function("sequential", |b| {
        b.iter(|| {
            let mut work = set.clone();
            black_box(despiker.apply(&mut work, &layout, &NoopReporter))
        });
    });
    group.bench_function("parallel", |b| {
        b.iter(|| {
            let mut work = set.clone();
            black_box(despiker.apply_parallel(&mut work, &layout, &NoopReporter))
        });
    });
    group.finish();
}

/// Benchmark: complete process + calculate on one hour of data
fn bench_pipeline(c: &mut Criterion) {
    let set = record(3600);
    let config = PipelineConfig {
        start: Some(0.0),
        stop: Some(3600.0),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config, &NoopReporter).expect("valid config");

    c.bench_function("pipeline_one_hour", |b| {
        b.iter(|| black_box(pipeline.run(&set).expect("pipeline runs")));
    });
}

criterion_group!(
    benches,
    bench_despike_channel,
    bench_despike_fan_out,
    bench_pipeline
);
criterion_main!(benches);
