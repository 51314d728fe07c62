//! Timing and statistics for a distributed search run.
//!
//! Compute time is measured per worker between the post-distribution
//! barrier and the end of that worker's local search, so data generation,
//! distribution, gathering and verification are all excluded. The reported
//! figure is the maximum over workers:
//!
//! ```ignore
//! let outcome = KnnJob::new(config)?.run()?;
//! println!("{}", outcome.report.summary());
//! // RunReport:
//! //   Queries: 128, Reference points: 400000, Dimension: 300
//! //   k: 1024 (effective 1024)
//! //   Workers: 4 x 2 threads, shard sizes [32, 32, 32, 32]
//! //   Compute time: 1.234567 s (max over workers)
//! ```

use crate::config::RunConfig;
use crate::verify::VerificationReport;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Statistics about one complete run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Configuration the run executed with, threads resolved.
    pub config: RunConfig,
    /// Neighbors returned per query.
    pub effective_k: usize,
    /// Queries assigned to each worker, by rank.
    pub shard_sizes: Vec<usize>,
    /// Threads each worker used.
    pub threads_per_worker: usize,
    /// Compute seconds measured on each worker, by rank.
    pub compute_seconds: Vec<f64>,
    /// Brute-force check, when requested.
    pub verification: Option<VerificationReport>,
}

impl RunReport {
    /// Compute time of the slowest worker.
    pub fn compute_time(&self) -> Duration {
        let max = self.compute_seconds.iter().copied().fold(0.0f64, f64::max);
        Duration::from_secs_f64(max)
    }

    /// True unless verification ran and failed.
    pub fn passed(&self) -> bool {
        self.verification.as_ref().map_or(true, |v| v.is_ok())
    }

    /// Create a human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "RunReport:\n  \
             Queries: {}, Reference points: {}, Dimension: {}\n  \
             k: {} (effective {})\n  \
             Workers: {} x {} threads, shard sizes {:?}\n  \
             Compute time: {:.6} s (max over workers)",
            self.config.queries,
            self.config.reference_points,
            self.config.dimension,
            self.config.k,
            self.effective_k,
            self.shard_sizes.len(),
            self.threads_per_worker,
            self.shard_sizes,
            self.compute_time().as_secs_f64(),
        );
        if let Some(verification) = &self.verification {
            out.push('\n');
            out.push_str(&verification.summary());
        }
        out
    }
}
