//! Benchmarks for top-k selection and the distributed pipeline.
//!
//! Run with: cargo bench --bench knn_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use forge_knn::{Dataset, KnnJob, RunConfig, ShardEngine, TopKSelector};

/// Single-query selection cost across k values.
fn benchmark_k_values(c: &mut Criterion) {
    let dataset = Dataset::generate(20_000, 1, 64, 1).unwrap();
    let query = dataset.queries.row(0);

    let mut group = c.benchmark_group("select_k");
    group.throughput(Throughput::Elements(dataset.reference.len() as u64));

    for k in [1, 16, 128, 1024, 4096] {
        let mut selector = TopKSelector::new(k).unwrap();
        group.bench_with_input(BenchmarkId::new("select", k), &k, |b, _| {
            b.iter(|| {
                let sorted = selector.select(black_box(query), &dataset.reference).unwrap();
                black_box(sorted.indices[0])
            })
        });
    }

    group.finish();
}

/// One worker's shard search across thread counts.
fn benchmark_thread_scaling(c: &mut Criterion) {
    let dataset = Dataset::generate(20_000, 64, 64, 2).unwrap();

    let mut group = c.benchmark_group("shard_threads");
    group.throughput(Throughput::Elements(dataset.queries.len() as u64));
    group.sample_size(10);

    for threads in [1, 2, 4, 8] {
        let engine = ShardEngine::new(threads).unwrap();
        group.bench_with_input(BenchmarkId::new("search", threads), &threads, |b, _| {
            b.iter(|| {
                engine
                    .search(&dataset.reference, black_box(&dataset.queries), 128)
                    .unwrap()
            })
        });
    }

    group.finish();
}

/// Full job including distribution and gathering, across worker counts.
fn benchmark_pipeline(c: &mut Criterion) {
    let dataset = Dataset::generate(20_000, 64, 64, 3).unwrap();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(dataset.queries.len() as u64));
    group.sample_size(10);

    for workers in [1, 2, 4] {
        let config = RunConfig::default()
            .with_queries(dataset.queries.len())
            .with_reference_points(dataset.reference.len())
            .with_dimension(dataset.reference.dim())
            .with_k(128)
            .with_workers(workers)
            .with_threads(2);
        let job = KnnJob::new(config).unwrap();

        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, _| {
            b.iter(|| job.run_on(black_box(&dataset)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_k_values,
    benchmark_thread_scaling,
    benchmark_pipeline,
);

criterion_main!(benches);
