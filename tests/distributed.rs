//! End-to-end tests of the distributed job across worker and thread counts.

use forge_knn::distance::scalar::squared_distance_f64;
use forge_knn::{verify_knn, Dataset, KnnError, KnnJob, PointSet, ResultMatrix, RunConfig};

fn config_for(dataset: &Dataset, k: usize) -> RunConfig {
    RunConfig::default()
        .with_queries(dataset.queries.len())
        .with_reference_points(dataset.reference.len())
        .with_dimension(dataset.reference.dim())
        .with_k(k)
}

fn run(dataset: &Dataset, k: usize, workers: usize, threads: usize) -> ResultMatrix {
    let config = config_for(dataset, k).with_workers(workers).with_threads(threads);
    KnnJob::new(config).unwrap().run_on(dataset).unwrap().matrix
}

fn corner_dataset() -> Dataset {
    let reference =
        PointSet::from_rows(&[[0.0, 0.0], [10.0, 10.0], [1.0, 1.0], [5.0, 5.0]], 2).unwrap();
    let queries = PointSet::from_rows(&[[0.0, 0.0]], 2).unwrap();
    Dataset::new(reference, queries)
}

#[test]
fn test_corner_scenario_any_layout() {
    let dataset = corner_dataset();
    for (workers, threads) in [(1, 1), (1, 4), (2, 1), (3, 2), (4, 3)] {
        let matrix = run(&dataset, 2, workers, threads);
        assert_eq!(matrix.rows(), 1);
        assert_eq!(matrix.row(0), &[0, 2], "W={} T={}", workers, threads);
    }
}

#[test]
fn test_layout_does_not_change_result() {
    let dataset = Dataset::generate(3_000, 50, 24, 5).unwrap();

    let baseline = run(&dataset, 20, 1, 1);
    for (workers, threads) in [(4, 3), (2, 5), (7, 1), (3, 8)] {
        let matrix = run(&dataset, 20, workers, threads);
        assert_eq!(baseline, matrix, "W={} T={}", workers, threads);
    }
}

#[test]
fn test_rows_are_valid_and_sorted() {
    let dataset = Dataset::generate(800, 30, 10, 17).unwrap();
    let matrix = run(&dataset, 15, 3, 2);

    assert_eq!(matrix.rows(), 30);
    assert_eq!(matrix.k(), 15);
    for (q, row) in matrix.iter_rows().enumerate() {
        let mut seen = row.to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), row.len(), "duplicate index in row {}", q);
        assert!(row.iter().all(|&i| (i as usize) < 800));

        let query = dataset.queries.row(q);
        let dists: Vec<f64> = row
            .iter()
            .map(|&i| squared_distance_f64(query, dataset.reference.row(i as usize)))
            .collect();
        assert!(
            dists.windows(2).all(|w| w[1] + 1e-5 >= w[0]),
            "row {} not ascending",
            q
        );
    }
}

#[test]
fn test_k_equal_to_reference_size() {
    let dataset = Dataset::generate(40, 6, 3, 23).unwrap();
    let config = config_for(&dataset, 40).with_workers(2).with_threads(2).with_verify(true);
    let outcome = KnnJob::new(config)
        .unwrap()
        .run_on(&dataset)
        .unwrap();

    assert_eq!(outcome.matrix.k(), 40);
    for row in outcome.matrix.iter_rows() {
        let mut all = row.to_vec();
        all.sort_unstable();
        assert_eq!(all, (0..40).collect::<Vec<u32>>());
    }
    assert!(outcome.report.passed(), "{}", outcome.report.summary());
}

#[test]
fn test_k_clamped_to_reference_size() {
    let dataset = Dataset::generate(10, 4, 2, 29).unwrap();
    let config = config_for(&dataset, 25).with_workers(2).with_threads(1).with_verify(true);
    let outcome = KnnJob::new(config)
        .unwrap()
        .run_on(&dataset)
        .unwrap();

    assert_eq!(outcome.matrix.k(), 10);
    assert_eq!(outcome.report.effective_k, 10);
    assert!(outcome.report.passed(), "{}", outcome.report.summary());
}

#[test]
fn test_fewer_queries_than_workers() {
    let dataset = Dataset::generate(200, 2, 5, 31).unwrap();
    let config = config_for(&dataset, 3).with_workers(5).with_threads(2);
    let outcome = KnnJob::new(config).unwrap().run_on(&dataset).unwrap();

    assert_eq!(outcome.report.shard_sizes, vec![1, 1, 0, 0, 0]);
    assert_eq!(outcome.report.compute_seconds.len(), 5);
    assert_eq!(outcome.matrix, run(&dataset, 3, 1, 1));
}

#[test]
fn test_seven_queries_on_three_workers() {
    let dataset = Dataset::generate(100, 7, 4, 37).unwrap();
    let config = config_for(&dataset, 4).with_workers(3).with_threads(1);
    let outcome = KnnJob::new(config).unwrap().run_on(&dataset).unwrap();

    assert_eq!(outcome.report.shard_sizes, vec![3, 2, 2]);
}

#[test]
fn test_oracle_agrees_with_job() {
    let config = RunConfig::default()
        .with_queries(24)
        .with_reference_points(2_000)
        .with_dimension(3)
        .with_k(64)
        .with_workers(3)
        .with_threads(2)
        .with_verify(true);
    let outcome = KnnJob::new(config).unwrap().run().unwrap();

    let report = outcome.report.verification.as_ref().unwrap();
    assert!(report.is_ok(), "{}", report.summary());
    assert_eq!(report.queries, 24);
    assert_eq!(report.order_violations, 0);
}

#[test]
fn test_oracle_flags_corrupted_result() {
    let dataset = corner_dataset();
    let mut indices = run(&dataset, 2, 2, 2).into_flat();
    indices.swap(0, 1);
    let corrupted = ResultMatrix::from_flat(indices, 1, 2).unwrap();

    let report = verify_knn(&dataset.queries, &dataset.reference, 2, &corrupted).unwrap();
    assert!(!report.is_ok());
    assert_eq!(report.order_violations, 1);
}

#[test]
fn test_invalid_configuration_rejected() {
    for config in [
        RunConfig::default().with_queries(0),
        RunConfig::default().with_reference_points(0),
        RunConfig::default().with_dimension(0),
        RunConfig::default().with_k(0),
        RunConfig::default().with_workers(0),
    ] {
        assert!(matches!(
            KnnJob::new(config),
            Err(KnnError::InvalidParameter(_))
        ));
    }
}
