//! Balanced, order-preserving splits of an index range.
//!
//! The same plan drives both parallelism levels: the coordinator splits the
//! query set across workers, and each worker splits its shard across its
//! threads. Part `p` always owns the contiguous range
//! `offsets[p]..offsets[p] + counts[p]`, so original order is recovered by
//! offset alone.

use crate::error::{KnnError, Result};
use std::ops::Range;

/// Contiguous (count, offset) assignment of `total` items to `parts` owners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionPlan {
    counts: Vec<usize>,
    offsets: Vec<usize>,
}

impl PartitionPlan {
    /// Split `total` items into `parts` contiguous ranges.
    ///
    /// The first `total % parts` ranges receive one extra item, so sizes
    /// differ by at most one. Ranges may be empty when `total < parts`.
    ///
    /// # Errors
    /// Returns an error if `parts` is zero.
    pub fn balanced(total: usize, parts: usize) -> Result<Self> {
        if parts == 0 {
            return Err(KnnError::invalid_parameter(
                "cannot partition across zero parts",
            ));
        }

        let base = total / parts;
        let remainder = total % parts;

        let mut counts = Vec::with_capacity(parts);
        let mut offsets = Vec::with_capacity(parts);
        let mut offset = 0;
        for p in 0..parts {
            let count = base + usize::from(p < remainder);
            counts.push(count);
            offsets.push(offset);
            offset += count;
        }

        Ok(Self { counts, offsets })
    }

    /// Number of parts.
    #[inline]
    pub fn parts(&self) -> usize {
        self.counts.len()
    }

    /// Total number of items covered.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Item count per part.
    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// First item of each part.
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Range owned by part `p`.
    #[inline]
    pub fn range(&self, p: usize) -> Range<usize> {
        self.offsets[p]..self.offsets[p] + self.counts[p]
    }

    /// Ranges of every part, in order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.parts()).map(move |p| self.range(p))
    }

    /// Multiply every count and offset by `stride`.
    ///
    /// Converts a plan over rows into a plan over flat elements, e.g. points
    /// into `f32` coordinates (stride D) or queries into result slots
    /// (stride k).
    pub fn scaled(&self, stride: usize) -> Self {
        Self {
            counts: self.counts.iter().map(|c| c * stride).collect(),
            offsets: self.offsets.iter().map(|o| o * stride).collect(),
        }
    }

    /// Check the plan invariants: offsets start at zero and are the exclusive
    /// prefix sum of the counts.
    pub fn is_consistent(&self) -> bool {
        if self.counts.len() != self.offsets.len() {
            return false;
        }
        let mut expected = 0;
        for (&count, &offset) in self.counts.iter().zip(&self.offsets) {
            if offset != expected {
                return false;
            }
            expected += count;
        }
        true
    }

    /// Split `data` into one disjoint mutable slice per part.
    ///
    /// `stride` is the number of elements per item, so part `p` receives
    /// `counts[p] * stride` elements.
    ///
    /// # Panics
    /// Panics if `data.len() != self.total() * stride`.
    pub fn split_mut<'a, T>(&self, data: &'a mut [T], stride: usize) -> Vec<&'a mut [T]> {
        assert_eq!(
            data.len(),
            self.total() * stride,
            "buffer does not match partition plan"
        );

        let mut chunks = Vec::with_capacity(self.parts());
        let mut rest = data;
        for &count in &self.counts {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(count * stride);
            chunks.push(head);
            rest = tail;
        }
        chunks
    }
}
