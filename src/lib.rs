//! forge-knn: distributed exact k-nearest-neighbor search in Rust.
//!
//! For every query point the crate finds the `k` reference points with the
//! smallest squared Euclidean distance, spreading the queries across a group
//! of message-passing workers and each worker's share across a thread pool.
//!
//! # Features
//!
//! - **Bounded Top-k Heaps**: O(N log k) selection per query with a fixed-size max-heap
//! - **SIMD Distance Functions**: AVX2/FMA and NEON kernels with scalar fallback
//! - **Two-Level Parallelism**: worker ranks over channels, Rayon threads inside each worker
//! - **Balanced Partitioning**: contiguous shards whose sizes differ by at most one
//! - **Verification Oracle**: independent f64 brute force with tie-aware comparison
//!
//! # Example
//!
//! ```
//! use forge_knn::{KnnJob, RunConfig};
//!
//! let config = RunConfig::default()
//!     .with_queries(16)
//!     .with_reference_points(1_000)
//!     .with_dimension(8)
//!     .with_k(10)
//!     .with_workers(2)
//!     .with_threads(2)
//!     .with_verify(true);
//!
//! let outcome = KnnJob::new(config).unwrap().run().unwrap();
//! assert_eq!(outcome.matrix.rows(), 16);
//! assert!(outcome.report.passed());
//! ```

pub mod cluster;
pub mod comm;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod distance;
pub mod engine;
pub mod error;
pub mod heap;
pub mod partition;
pub mod points;
pub mod report;
pub mod result;
pub mod select;
pub mod verify;

// Re-export commonly used types at crate root
pub use cluster::{KnnJob, KnnOutcome};
pub use config::RunConfig;
pub use dataset::Dataset;
pub use distance::DistanceMetric;
pub use engine::ShardEngine;
pub use error::{KnnError, Result};
pub use heap::{BoundedMaxHeap, SortedNeighbors};
pub use partition::PartitionPlan;
pub use points::PointSet;
pub use report::RunReport;
pub use result::{Neighbor, ResultMatrix};
pub use select::TopKSelector;
pub use verify::{verify_knn, VerificationReport};
