#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
//! Benchmark for building single-panel plots.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trueno_gg::grammar::SmoothMethod;
use trueno_gg::prelude::*;

fn frame(size: usize) -> DataFrame {
    let groups = ["a", "b", "c", "d"];
    DataFrame::new()
        .with_column("x", (0..size).map(|i| i as f64 / size as f64 * 100.0))
        .with_column(
            "y",
            (0..size).map(|i| {
                let x = i as f64 / size as f64;
                (x * std::f64::consts::TAU).sin() * 50.0 + 50.0 + (i % 17) as f64
            }),
        )
        .with_column("g", (0..size).map(|i| groups[i % groups.len()]))
}

fn pipeline_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for size in [100, 1_000, 10_000] {
        let data = std::sync::Arc::new(frame(size));

        group.bench_with_input(BenchmarkId::new("scatter", size), &size, |b, _| {
            let plot = GGPlot::new()
                .shared_data(data.clone())
                .aes(AestheticMap::new().x("x").y("y").color("g"))
                .geom(Geom::point());
            b.iter(|| black_box(&plot).build().unwrap());
        });

        group.bench_with_input(BenchmarkId::new("histogram", size), &size, |b, _| {
            let plot = GGPlot::new()
                .shared_data(data.clone())
                .aes(AestheticMap::new().x("y").fill("g"))
                .geom(Geom::histogram().bins(30));
            b.iter(|| black_box(&plot).build().unwrap());
        });

        group.bench_with_input(BenchmarkId::new("smooth_linear", size), &size, |b, _| {
            let plot = GGPlot::new()
                .shared_data(data.clone())
                .aes(AestheticMap::new().x("x").y("y"))
                .geom(Geom::smooth().method(SmoothMethod::Linear));
            b.iter(|| black_box(&plot).build().unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
