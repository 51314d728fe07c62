//! Benchmarks for squared distance kernels.
//!
//! Run with: cargo bench --bench distance_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use forge_knn::distance::{scalar, simd};
use forge_knn::Dataset;

fn benchmark_distances(c: &mut Criterion) {
    let dimensions = vec![16, 64, 128, 300, 512, 1024];

    for dim in &dimensions {
        let pair = Dataset::generate(1, 1, *dim, *dim as u64).unwrap();
        let a = pair.reference.row(0);
        let b = pair.queries.row(0);

        let mut group = c.benchmark_group(format!("squared_{}", dim));

        group.bench_function("scalar", |bench| {
            bench.iter(|| scalar::squared_distance(black_box(a), black_box(b)))
        });

        group.bench_function("simd", |bench| {
            bench.iter(|| simd::squared_distance(black_box(a), black_box(b)))
        });

        group.bench_function("scalar_f64", |bench| {
            bench.iter(|| scalar::squared_distance_f64(black_box(a), black_box(b)))
        });

        group.finish();
    }

    // Throughput: one query against 10K reference points at the default dimension
    let dataset = Dataset::generate(10_000, 1, 300, 42).unwrap();
    let query = dataset.queries.row(0);

    let mut group = c.benchmark_group("distance_throughput");
    group.throughput(Throughput::Elements(dataset.reference.len() as u64));
    group.bench_function("10k_300d", |bench| {
        bench.iter(|| {
            let sum: f32 = dataset
                .reference
                .iter()
                .map(|p| simd::squared_distance(black_box(query), black_box(p)))
                .sum();
            black_box(sum)
        })
    });
    group.finish();
}

criterion_group!(benches, benchmark_distances);
criterion_main!(benches);
