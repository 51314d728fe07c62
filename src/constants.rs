//! Named constants for configuration values.
//!
//! Defaults for a run and the tolerances used by the verification oracle
//! live here so they can be found and tuned in one place.

/// Default run parameters.
pub mod defaults {
    /// Number of query points.
    pub const QUERIES: usize = 128;

    /// Number of reference points.
    pub const REFERENCE_POINTS: usize = 400_000;

    /// Point dimensionality.
    pub const DIMENSION: usize = 300;

    /// Neighbors per query.
    pub const K: usize = 1024;

    /// Number of workers in the message-passing group.
    pub const WORKERS: usize = 1;

    /// Threads per worker; 0 means derive from available parallelism.
    pub const THREADS: usize = 0;

    /// Seed for the synthetic dataset generator.
    pub const SEED: u64 = 42;
}

/// Constants for the brute-force verification oracle.
pub mod verify {
    /// Tolerance for treating two distances as tied.
    pub const TIE_EPSILON: f64 = 1e-7;

    /// Maximum number of mismatched rows retained with full detail.
    pub const MAX_REPORTED_MISMATCHES: usize = 10;
}

/// Constants for the message-passing layer.
pub mod comm {
    /// Rank that owns the full dataset and assembles the result.
    pub const ROOT: usize = 0;
}
