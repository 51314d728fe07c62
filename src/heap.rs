//! Bounded max-heap over (distance, index) pairs.
//!
//! The heap keeps the `k` smallest distances seen so far with the largest of
//! them at the root, so a new candidate only has to beat `distances[0]` to
//! enter. Distances and reference indices live in two parallel arrays that
//! are swapped in lockstep.
//!
//! Once [`BoundedMaxHeap::finalize`] has run, the arrays hold the same pairs
//! in ascending distance order and no longer satisfy the heap property until
//! the heap is rebuilt.

use crate::error::{try_alloc, Result};

/// Fixed-capacity binary max-heap keyed by distance.
#[derive(Clone, Debug)]
pub struct BoundedMaxHeap {
    distances: Vec<f32>,
    indices: Vec<u32>,
    len: usize,
}

/// Ascending (distance, index) pairs produced by [`BoundedMaxHeap::finalize`].
#[derive(Clone, Copy, Debug)]
pub struct SortedNeighbors<'a> {
    /// Distances, non-decreasing.
    pub distances: &'a [f32],
    /// Reference indices matching `distances` position by position.
    pub indices: &'a [u32],
}

impl SortedNeighbors<'_> {
    /// Number of neighbors.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if there are no neighbors.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl BoundedMaxHeap {
    /// Create an empty heap that can hold `capacity` pairs.
    ///
    /// The scratch arrays are allocated once here and reused for every query.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            distances: try_alloc(capacity, 0.0f32, "heap distances")?,
            indices: try_alloc(capacity, 0u32, "heap indices")?,
            len: 0,
        })
    }

    /// Maximum number of pairs the heap can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.distances.len()
    }

    /// Number of live pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the heap holds no pairs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest distance currently held, if any.
    #[inline]
    pub fn peek_max(&self) -> Option<f32> {
        if self.len == 0 {
            None
        } else {
            Some(self.distances[0])
        }
    }

    /// Live distances in heap order.
    pub fn distances(&self) -> &[f32] {
        &self.distances[..self.len]
    }

    /// Live indices in heap order.
    pub fn indices(&self) -> &[u32] {
        &self.indices[..self.len]
    }

    /// Replace the contents with `pairs` and heapify bottom-up in O(n).
    ///
    /// # Panics
    /// Panics if more pairs are supplied than the heap can hold.
    pub fn rebuild<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (f32, u32)>,
    {
        self.len = 0;
        for (distance, index) in pairs {
            assert!(self.len < self.capacity(), "heap capacity exceeded");
            self.distances[self.len] = distance;
            self.indices[self.len] = index;
            self.len += 1;
        }
        for i in (0..self.len / 2).rev() {
            self.sift_down(i, self.len);
        }
    }

    /// Offer a candidate; it replaces the root only if strictly closer.
    ///
    /// Returns true if the candidate entered the heap. A candidate tied with
    /// the current maximum is rejected.
    #[inline]
    pub fn offer(&mut self, distance: f32, index: u32) -> bool {
        if self.len == 0 || distance >= self.distances[0] {
            return false;
        }
        self.distances[0] = distance;
        self.indices[0] = index;
        self.sift_down(0, self.len);
        true
    }

    /// Sort the live pairs ascending by distance, in place.
    ///
    /// Repeatedly moves the root behind the shrinking live region, which
    /// leaves the smallest distance first without a separate reversal.
    pub fn finalize(&mut self) -> SortedNeighbors<'_> {
        for end in (1..self.len).rev() {
            self.distances.swap(0, end);
            self.indices.swap(0, end);
            self.sift_down(0, end);
        }
        SortedNeighbors {
            distances: &self.distances[..self.len],
            indices: &self.indices[..self.len],
        }
    }

    /// Check the max-heap property over the live region.
    pub fn is_max_heap(&self) -> bool {
        (1..self.len).all(|i| self.distances[(i - 1) / 2] >= self.distances[i])
    }

    /// Restore the heap property below `i` within `distances[..size]`.
    #[inline]
    fn sift_down(&mut self, mut i: usize, size: usize) {
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut largest = i;

            if left < size && self.distances[left] > self.distances[largest] {
                largest = left;
            }
            if right < size && self.distances[right] > self.distances[largest] {
                largest = right;
            }
            if largest == i {
                break;
            }

            self.distances.swap(i, largest);
            self.indices.swap(i, largest);
            i = largest;
        }
    }
}
