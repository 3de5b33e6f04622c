//! Benchmarks for diagram construction.
//!
//! Measures `build` over seeded uniform site sets of increasing size, the
//! sweep alone (no clipping), and raster labelling for comparison.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;
use sweepline_core::{build, raster, BoundingBox, BuildOptions, Point, Sweep};

fn random_sites(count: usize, bounds: &BoundingBox, seed: u64) -> Vec<Point> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Point::new(
                rng.gen_range(bounds.min.x..bounds.max.x),
                rng.gen_range(bounds.min.y..bounds.max.y),
            )
        })
        .collect()
}

fn benchmark_build(c: &mut Criterion) {
    let bounds = BoundingBox::from_size(1000.0, 1000.0);
    let mut group = c.benchmark_group("build");
    for count in [10usize, 100, 500, 2_000, 10_000] {
        let sites = random_sites(count, &bounds, 42);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &sites, |b, sites| {
            b.iter(|| build(black_box(sites), bounds).unwrap());
        });
    }
    group.finish();
}

fn benchmark_sweep(c: &mut Criterion) {
    let bounds = BoundingBox::from_size(1000.0, 1000.0);
    let options = BuildOptions::default();
    let mut group = c.benchmark_group("sweep");
    for count in [500usize, 10_000] {
        let sites = random_sites(count, &bounds, 7);
        group.bench_with_input(BenchmarkId::from_parameter(count), &sites, |b, sites| {
            b.iter(|| Sweep::new(black_box(sites), &options).unwrap().into_graph());
        });
    }
    group.finish();
}

fn benchmark_raster(c: &mut Criterion) {
    let bounds = BoundingBox::from_size(640.0, 480.0);
    let sites = random_sites(500, &bounds, 3);
    c.bench_function("raster/label_640x480_500_sites", |b| {
        b.iter(|| raster::label(black_box(&sites), &bounds, 640, 480));
    });
}

criterion_group!(benches, benchmark_build, benchmark_sweep, benchmark_raster);
criterion_main!(benches);
