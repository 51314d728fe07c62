//! Per-query top-k selection against a reference set.
//!
//! [`TopKSelector`] scans every reference point once: the first `k` distances
//! seed a [`BoundedMaxHeap`], every later point is offered against the
//! current worst, and the heap is finally sorted in place. Total cost is
//! O(N log k) instead of the O(N log N) of sorting all candidates.

use crate::distance::DistanceMetric;
use crate::error::{KnnError, Result};
use crate::heap::{BoundedMaxHeap, SortedNeighbors};
use crate::points::PointSet;

/// Reusable top-k selection state owned by a single thread.
#[derive(Clone, Debug)]
pub struct TopKSelector {
    heap: BoundedMaxHeap,
    k: usize,
    metric: DistanceMetric,
}

impl TopKSelector {
    /// Create a selector returning `k` neighbors per query.
    ///
    /// `k` is the effective count: callers clamp it to the reference set size.
    pub fn new(k: usize) -> Result<Self> {
        Self::with_metric(k, DistanceMetric::default())
    }

    /// Create a selector using a specific distance metric.
    pub fn with_metric(k: usize, metric: DistanceMetric) -> Result<Self> {
        Ok(Self {
            heap: BoundedMaxHeap::with_capacity(k)?,
            k,
            metric,
        })
    }

    /// Effective number of neighbors per query.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Seed the heap with the first `k` reference points.
    ///
    /// # Panics
    /// Panics if `query` and the reference points differ in dimension.
    pub fn initialize(&mut self, query: &[f32], reference: &PointSet) {
        let metric = self.metric;
        self.heap.rebuild(
            (0..self.k).map(|idx| (metric.compute(query, reference.row(idx)), idx as u32)),
        );
    }

    /// Offer reference point `idx`; returns true if it displaced the current worst.
    #[inline]
    pub fn offer(&mut self, query: &[f32], reference: &PointSet, idx: usize) -> bool {
        let distance = self.metric.compute(query, reference.row(idx));
        self.heap.offer(distance, idx as u32)
    }

    /// Sort the retained neighbors ascending by distance.
    pub fn finalize(&mut self) -> SortedNeighbors<'_> {
        self.heap.finalize()
    }

    /// Run a full selection for one query.
    ///
    /// # Errors
    /// Returns an error if the reference set holds fewer than `k` points or
    /// its dimension differs from the query's.
    pub fn select(&mut self, query: &[f32], reference: &PointSet) -> Result<SortedNeighbors<'_>> {
        if reference.len() < self.k {
            return Err(KnnError::invalid_parameter(format!(
                "k ({}) exceeds reference set size ({})",
                self.k,
                reference.len()
            )));
        }
        if query.len() != reference.dim() {
            return Err(KnnError::dimension_mismatch(reference.dim(), query.len()));
        }

        self.initialize(query, reference);
        for idx in self.k..reference.len() {
            self.offer(query, reference, idx);
        }
        Ok(self.finalize())
    }
}
