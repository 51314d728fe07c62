//! Run configuration shared by every rank.
//!
//! A single [`RunConfig`] is built and validated at the coordinator, then
//! broadcast verbatim to every worker before any point data moves.
//!
//! ```
//! use forge_knn::RunConfig;
//!
//! let config = RunConfig::default()
//!     .with_queries(64)
//!     .with_reference_points(10_000)
//!     .with_dimension(32)
//!     .with_k(10)
//!     .with_workers(4)
//!     .with_threads(2);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.effective_k(), 10);
//! ```

use crate::constants::defaults;
use crate::error::{KnnError, Result};
use serde::{Deserialize, Serialize};

/// Parameters of one distributed k-nearest-neighbor job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of query points (nq).
    pub queries: usize,
    /// Number of reference points (N).
    pub reference_points: usize,
    /// Dimensionality of every point (D).
    pub dimension: usize,
    /// Requested neighbors per query.
    pub k: usize,
    /// Number of ranks in the message-passing group (W).
    pub workers: usize,
    /// Threads per worker (T); 0 derives it from available parallelism.
    pub threads: usize,
    /// Check the result against a brute-force oracle at the coordinator.
    pub verify: bool,
    /// Seed for the synthetic dataset.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            queries: defaults::QUERIES,
            reference_points: defaults::REFERENCE_POINTS,
            dimension: defaults::DIMENSION,
            k: defaults::K,
            workers: defaults::WORKERS,
            threads: defaults::THREADS,
            verify: false,
            seed: defaults::SEED,
        }
    }
}

impl RunConfig {
    /// Set the number of query points.
    pub fn with_queries(mut self, queries: usize) -> Self {
        self.queries = queries;
        self
    }

    /// Set the number of reference points.
    pub fn with_reference_points(mut self, reference_points: usize) -> Self {
        self.reference_points = reference_points;
        self
    }

    /// Set the point dimensionality.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Set the requested number of neighbors.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the threads per worker (0 = auto).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enable or disable verification.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Set the dataset seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate every size parameter.
    ///
    /// # Errors
    /// Returns `InvalidParameter` naming the first parameter that is zero or
    /// that does not fit the `u32` index space of the result matrix.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("queries", self.queries),
            ("reference_points", self.reference_points),
            ("dimension", self.dimension),
            ("k", self.k),
            ("workers", self.workers),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(KnnError::invalid_parameter(format!("{} must be > 0", name)));
            }
        }
        if self.reference_points > u32::MAX as usize {
            return Err(KnnError::invalid_parameter(format!(
                "reference_points must be <= {}",
                u32::MAX
            )));
        }
        Ok(())
    }

    /// Neighbors actually returned per query: `min(k, reference_points)`.
    #[inline]
    pub fn effective_k(&self) -> usize {
        self.k.min(self.reference_points)
    }

    /// Threads per worker after resolving `threads == 0`.
    ///
    /// Auto mode divides the machine's parallelism evenly between workers,
    /// with at least one thread each.
    pub fn resolved_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (available / self.workers.max(1)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queries, 128);
        assert_eq!(config.reference_points, 400_000);
        assert_eq!(config.dimension, 300);
        assert_eq!(config.k, 1024);
    }

    #[test]
    fn test_zero_parameters_rejected() {
        for config in [
            RunConfig::default().with_queries(0),
            RunConfig::default().with_reference_points(0),
            RunConfig::default().with_dimension(0),
            RunConfig::default().with_k(0),
            RunConfig::default().with_workers(0),
        ] {
            assert!(matches!(
                config.validate(),
                Err(KnnError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_error_names_parameter() {
        let err = RunConfig::default().with_k(0).validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid parameter: k must be > 0");
    }

    #[test]
    fn test_effective_k_clamps() {
        let config = RunConfig::default().with_reference_points(5).with_k(10);
        assert_eq!(config.effective_k(), 5);
    }

    #[test]
    fn test_resolved_threads() {
        assert_eq!(RunConfig::default().with_threads(3).resolved_threads(), 3);
        assert!(RunConfig::default().with_threads(0).resolved_threads() >= 1);
        assert!(
            RunConfig::default()
                .with_threads(0)
                .with_workers(10_000)
                .resolved_threads()
                >= 1
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let config = RunConfig::default().with_k(7).with_verify(true);
        let json = serde_json::to_string(&config).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
