//! Thread-level execution of one worker's query shard.
//!
//! The shard is cut into `threads` contiguous ranges with the same
//! [`PartitionPlan`] used across workers. Each range runs as its own task on
//! the worker's Rayon pool with a private [`TopKSelector`], reads the shared
//! reference set immutably, and writes into a disjoint slice of the output,
//! so the compute phase needs no locks.

use crate::error::{try_alloc, KnnError, Result};
use crate::partition::PartitionPlan;
use crate::points::PointSet;
use crate::result::{assemble, ResultMatrix};
use crate::select::TopKSelector;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ops::Range;

/// Per-worker search engine backed by a fixed-size thread pool.
pub struct ShardEngine {
    pool: ThreadPool,
    threads: usize,
}

impl ShardEngine {
    /// Build an engine with `threads` worker threads.
    ///
    /// # Errors
    /// Returns an error if `threads` is zero or the pool cannot be created.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(KnnError::invalid_parameter("threads must be > 0"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("knn-thread-{}", i))
            .build()?;
        Ok(Self { pool, threads })
    }

    /// Number of threads the shard is split across.
    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Find the `k` nearest reference points for every query in the shard.
    ///
    /// Row `i` of the returned matrix belongs to `queries.row(i)` no matter
    /// which thread computed it. An empty shard yields an empty matrix.
    ///
    /// # Errors
    /// Returns an error if `k` is zero or exceeds the reference set, if the
    /// dimensions differ, or if a buffer cannot be allocated.
    pub fn search(
        &self,
        reference: &PointSet,
        queries: &PointSet,
        k: usize,
    ) -> Result<ResultMatrix> {
        if k == 0 || k > reference.len() {
            return Err(KnnError::invalid_parameter(format!(
                "k must be in 1..={}, got {}",
                reference.len(),
                k
            )));
        }
        if queries.dim() != reference.dim() {
            return Err(KnnError::dimension_mismatch(reference.dim(), queries.dim()));
        }

        let rows = queries.len();
        let mut out = try_alloc(rows * k, 0u32, "result shard")?;
        let plan = PartitionPlan::balanced(rows, self.threads)?;

        tracing::trace!(rows, k, counts = ?plan.counts(), "thread plan");

        let tasks: Vec<(Range<usize>, &mut [u32])> =
            plan.ranges().zip(plan.split_mut(&mut out, k)).collect();

        self.pool.install(|| {
            tasks
                .into_par_iter()
                .with_max_len(1)
                .try_for_each(|(range, block)| search_range(reference, queries, k, range, block))
        })?;

        ResultMatrix::from_flat(out, rows, k)
    }
}

/// Evaluate the queries in `range`, writing one row of `k` indices each.
fn search_range(
    reference: &PointSet,
    queries: &PointSet,
    k: usize,
    range: Range<usize>,
    block: &mut [u32],
) -> Result<()> {
    if range.is_empty() {
        return Ok(());
    }

    let mut selector = TopKSelector::new(k)?;
    for (q, row) in range.zip(block.chunks_exact_mut(k)) {
        let sorted = selector.select(queries.row(q), reference)?;
        assemble(&sorted, row);
    }
    Ok(())
}
