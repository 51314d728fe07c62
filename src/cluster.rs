//! The distributed k-nearest-neighbor job.
//!
//! Every rank runs [`rank_main`]; the root additionally owns the dataset.
//! The phases, executed by all ranks in the same order, are:
//!
//! 1. broadcast the validated [`RunConfig`]
//! 2. replicate the reference set on every rank
//! 3. scatter query shards along a balanced [`PartitionPlan`]
//! 4. barrier, then search the local shard on the worker's thread pool
//! 5. gather per-rank compute times and result blocks at the root
//!
//! The root then assembles the [`ResultMatrix`], optionally verifies it
//! against brute force and returns it together with a [`RunReport`].

use crate::comm::{run_group, Communicator};
use crate::config::RunConfig;
use crate::constants::comm::ROOT;
use crate::dataset::Dataset;
use crate::engine::ShardEngine;
use crate::error::{KnnError, Result};
use crate::partition::PartitionPlan;
use crate::points::PointSet;
use crate::report::RunReport;
use crate::result::ResultMatrix;
use crate::verify::verify_knn;
use std::time::Instant;

/// Result of a completed job, available at the root.
#[derive(Clone, Debug)]
pub struct KnnOutcome {
    /// `queries x effective_k` neighbor indices, in query order.
    pub matrix: ResultMatrix,
    /// Timing and verification summary.
    pub report: RunReport,
}

/// A validated job ready to run on a group of workers.
#[derive(Clone, Debug)]
pub struct KnnJob {
    config: RunConfig,
}

impl KnnJob {
    /// Validate `config` and resolve its thread count.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if any size parameter is invalid.
    pub fn new(mut config: RunConfig) -> Result<Self> {
        config.validate()?;
        config.threads = config.resolved_threads();
        Ok(Self { config })
    }

    /// The configuration every rank will receive.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Generate the seeded dataset at the root and run the job on it.
    pub fn run(&self) -> Result<KnnOutcome> {
        let dataset = Dataset::from_config(&self.config)?;
        tracing::info!(
            reference_points = dataset.reference.len(),
            queries = dataset.queries.len(),
            dim = self.config.dimension,
            seed = self.config.seed,
            "dataset generated"
        );
        self.run_on(&dataset)
    }

    /// Run the job on an existing dataset owned by the root.
    ///
    /// # Errors
    /// Returns an error if the dataset does not match the configuration, or
    /// the first failure of any rank.
    pub fn run_on(&self, dataset: &Dataset) -> Result<KnnOutcome> {
        let config = &self.config;
        if dataset.reference.len() != config.reference_points {
            return Err(KnnError::invalid_parameter(format!(
                "reference set has {} points, configuration says {}",
                dataset.reference.len(),
                config.reference_points
            )));
        }
        if dataset.queries.len() != config.queries {
            return Err(KnnError::invalid_parameter(format!(
                "query set has {} points, configuration says {}",
                dataset.queries.len(),
                config.queries
            )));
        }
        for dim in [dataset.reference.dim(), dataset.queries.dim()] {
            if dim != config.dimension {
                return Err(KnnError::dimension_mismatch(config.dimension, dim));
            }
        }

        tracing::info!(
            workers = config.workers,
            threads = config.threads,
            k = config.k,
            k_eff = config.effective_k(),
            "starting job"
        );

        let outcomes = run_group(config.workers, |comm| {
            let root = (comm.rank() == ROOT).then_some((config, dataset));
            rank_main(comm, root)
        })?;

        outcomes
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| KnnError::transport(ROOT, "root returned no result"))
    }
}

/// One rank's side of the job. `root` is `Some` only on the root rank.
fn rank_main(
    comm: &mut Communicator,
    root: Option<(&RunConfig, &Dataset)>,
) -> Result<Option<KnnOutcome>> {
    let rank = comm.rank();

    let config = comm.broadcast(ROOT, root.map(|(config, _)| config.clone()))?;
    let dim = config.dimension;
    let k_eff = config.effective_k();

    let replica =
        comm.broadcast_slice(ROOT, root.map(|(_, dataset)| dataset.reference.as_flat()))?;
    let owned;
    let reference = match (root, replica) {
        (Some((_, dataset)), _) => &dataset.reference,
        (None, Some(data)) => {
            owned = PointSet::from_flat(data, dim)?;
            &owned
        }
        (None, None) => return Err(KnnError::transport(rank, "no reference replica received")),
    };
    if reference.len() != config.reference_points {
        return Err(KnnError::transport(
            rank,
            format!(
                "reference replica has {} points, expected {}",
                reference.len(),
                config.reference_points
            ),
        ));
    }
    if root.is_some() {
        tracing::info!(bytes = reference.memory_bytes(), "reference set broadcast");
    }

    let plan = match root {
        Some(_) => Some(PartitionPlan::balanced(config.queries, comm.size())?),
        None => None,
    };
    let local_nq: usize = comm.scatter(ROOT, plan.as_ref().map(|p| p.counts().to_vec()))?;

    let point_plan = plan.as_ref().map(|p| p.scaled(dim));
    let send = root
        .zip(point_plan.as_ref())
        .map(|((_, dataset), p)| (dataset.queries.as_flat(), p));
    let shard = comm.scatterv(ROOT, send)?;
    if shard.len() != local_nq * dim {
        return Err(KnnError::transport(
            rank,
            format!("query shard has {} values, expected {}", shard.len(), local_nq * dim),
        ));
    }
    let queries = PointSet::from_flat(shard, dim)?;
    if let Some(plan) = &plan {
        tracing::info!(counts = ?plan.counts(), offsets = ?plan.offsets(), "queries scattered");
    }

    tracing::debug!(
        rank,
        local_nq,
        first = ?queries.as_flat().first(),
        last = ?queries.as_flat().last(),
        "shard received"
    );

    let engine = ShardEngine::new(config.threads)?;

    comm.barrier()?;
    let start = Instant::now();
    let local = engine.search(reference, &queries, k_eff)?;
    let seconds = start.elapsed().as_secs_f64();

    tracing::debug!(rank, seconds, "local search finished");

    let times = comm.gather(ROOT, seconds)?;
    let result_plan = plan.as_ref().map(|p| p.scaled(k_eff));
    let gathered = comm.gatherv(ROOT, local.into_flat(), result_plan.as_ref())?;

    let (Some((_, dataset)), Some(plan), Some(times), Some(indices)) =
        (root, plan, times, gathered)
    else {
        return Ok(None);
    };

    let matrix = ResultMatrix::from_flat(indices, config.queries, k_eff)?;
    let mut report = RunReport {
        effective_k: k_eff,
        shard_sizes: plan.counts().to_vec(),
        threads_per_worker: config.threads,
        compute_seconds: times,
        verification: None,
        config,
    };
    tracing::info!(
        seconds = report.compute_time().as_secs_f64(),
        "results gathered"
    );

    if report.config.verify {
        let verification = verify_knn(&dataset.queries, reference, report.config.k, &matrix)?;
        if verification.is_ok() {
            tracing::info!(queries = verification.queries, "verification passed");
        } else {
            tracing::warn!(
                mismatched_rows = verification.mismatched_rows,
                out_of_range_rows = verification.out_of_range_rows,
                order_violations = verification.order_violations,
                "verification failed"
            );
        }
        report.verification = Some(verification);
    }

    Ok(Some(KnnOutcome { matrix, report }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RunConfig {
        RunConfig::default()
            .with_queries(9)
            .with_reference_points(120)
            .with_dimension(4)
            .with_k(5)
            .with_threads(2)
            .with_seed(3)
    }

    #[test]
    fn test_single_worker_run() {
        let outcome = KnnJob::new(small_config().with_verify(true))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(outcome.matrix.rows(), 9);
        assert_eq!(outcome.matrix.k(), 5);
        assert_eq!(outcome.report.shard_sizes, vec![9]);
        assert_eq!(outcome.report.compute_seconds.len(), 1);
        assert!(outcome.report.passed(), "{}", outcome.report.summary());
    }

    #[test]
    fn test_workers_match_single_worker() {
        let single = KnnJob::new(small_config()).unwrap().run().unwrap();
        let multi = KnnJob::new(small_config().with_workers(4))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(multi.report.shard_sizes, vec![3, 2, 2, 2]);
        assert_eq!(single.matrix, multi.matrix);
    }

    #[test]
    fn test_auto_threads_resolved_before_broadcast() {
        let job = KnnJob::new(small_config().with_threads(0)).unwrap();
        assert!(job.config().threads >= 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(KnnJob::new(small_config().with_k(0)).is_err());
        assert!(KnnJob::new(small_config().with_workers(0)).is_err());
    }

    #[test]
    fn test_dataset_must_match_config() {
        let job = KnnJob::new(small_config()).unwrap();
        let dataset = Dataset::generate(120, 8, 4, 3).unwrap();
        assert!(job.run_on(&dataset).is_err());

        let wide = Dataset::generate(120, 9, 5, 3).unwrap();
        assert!(matches!(
            job.run_on(&wide),
            Err(KnnError::DimensionMismatch { .. })
        ));
    }
}
