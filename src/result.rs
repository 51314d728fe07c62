//! Neighbor results and the assembled result matrix.

use crate::error::{KnnError, Result};
use crate::heap::SortedNeighbors;
use serde::{Deserialize, Serialize};

/// A reference point and its squared distance to a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Row of the point in the reference set.
    pub index: u32,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

impl Neighbor {
    /// Create a new Neighbor.
    #[inline]
    pub fn new(index: u32, distance: f32) -> Self {
        Self { index, distance }
    }
}

impl From<(u32, f32)> for Neighbor {
    fn from((index, distance): (u32, f32)) -> Self {
        Self::new(index, distance)
    }
}

impl SortedNeighbors<'_> {
    /// Collect the (index, distance) pairs in ascending order.
    pub fn to_neighbors(&self) -> Vec<Neighbor> {
        self.indices
            .iter()
            .zip(self.distances)
            .map(|(&index, &distance)| Neighbor::new(index, distance))
            .collect()
    }
}

/// Write the index component of a finalized selection into `row`.
///
/// Distances are dropped here: ordering has already been resolved by the
/// selector.
///
/// # Panics
/// Panics if `row` and `sorted` differ in length.
#[inline]
pub fn assemble(sorted: &SortedNeighbors<'_>, row: &mut [u32]) {
    row.copy_from_slice(sorted.indices);
}

/// Row-major `rows x k` matrix of neighbor indices.
///
/// Row `i` holds the neighbors of query `i`, nearest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMatrix {
    indices: Vec<u32>,
    rows: usize,
    k: usize,
}

impl ResultMatrix {
    /// Wrap a flat buffer of `rows * k` indices.
    ///
    /// # Errors
    /// Returns an error if the buffer length is not `rows * k`.
    pub fn from_flat(indices: Vec<u32>, rows: usize, k: usize) -> Result<Self> {
        if indices.len() != rows * k {
            return Err(KnnError::dimension_mismatch(rows * k, indices.len()));
        }
        Ok(Self { indices, rows, k })
    }

    /// Number of query rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Neighbors per row.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Neighbor indices of query `i`.
    ///
    /// # Panics
    /// Panics if `i >= self.rows()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[u32] {
        &self.indices[i * self.k..(i + 1) * self.k]
    }

    /// Iterate over rows in query order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// The flat row-major buffer.
    #[inline]
    pub fn as_flat(&self) -> &[u32] {
        &self.indices
    }

    /// Consume the matrix and return its flat buffer.
    pub fn into_flat(self) -> Vec<u32> {
        self.indices
    }
}
