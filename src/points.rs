//! Contiguous row-major point storage.
//!
//! A [`PointSet`] keeps N points of dimension D in one flat `Vec<f32>` so that
//! row `i` occupies `data[i * D..(i + 1) * D]`. The flat layout is what moves
//! between ranks and what the distance kernels scan.

use crate::error::{try_alloc, KnnError, Result};
use std::ops::Range;

/// An ordered collection of fixed-dimension points.
#[derive(Clone, Debug, PartialEq)]
pub struct PointSet {
    data: Vec<f32>,
    dim: usize,
}

impl PointSet {
    /// Wrap a flat row-major buffer.
    ///
    /// # Errors
    /// Returns an error if `dim` is zero or the buffer length is not a
    /// multiple of `dim`.
    pub fn from_flat(data: Vec<f32>, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(KnnError::invalid_parameter("dimension must be > 0"));
        }
        if data.len() % dim != 0 {
            let rows = data.len() / dim;
            return Err(KnnError::dimension_mismatch((rows + 1) * dim, data.len()));
        }
        Ok(Self { data, dim })
    }

    /// Build a point set from individual rows.
    ///
    /// # Errors
    /// Returns an error if the rows do not all have length `dim`.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R], dim: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(KnnError::dimension_mismatch(dim, row.len()));
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(data, dim)
    }

    /// Allocate a zero-filled set of `len` points.
    ///
    /// `resource` names the buffer in the error if allocation fails.
    pub fn zeroed(len: usize, dim: usize, resource: &'static str) -> Result<Self> {
        let total = len
            .checked_mul(dim)
            .ok_or_else(|| KnnError::allocation_failed(resource, usize::MAX))?;
        let data = try_alloc(total, 0.0f32, resource)?;
        Self::from_flat(data, dim)
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// True if the set holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Dimensionality of every point.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Coordinates of point `i`.
    ///
    /// # Panics
    /// Panics if `i >= self.len()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dim;
        &self.data[start..start + self.dim]
    }

    /// Flat coordinates of the points in `range`.
    #[inline]
    pub fn rows(&self, range: Range<usize>) -> &[f32] {
        &self.data[range.start * self.dim..range.end * self.dim]
    }

    /// Iterate over the points in order.
    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.dim)
    }

    /// The underlying flat buffer.
    #[inline]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to the underlying flat buffer.
    #[inline]
    pub fn as_flat_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the set and return its flat buffer.
    pub fn into_flat(self) -> Vec<f32> {
        self.data
    }

    /// Size of the coordinate buffer in bytes.
    pub fn memory_bytes(&self) -> usize {
        std::mem::size_of_val(self.data.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_access() {
        let set = PointSet::from_flat(vec![0.0, 0.0, 10.0, 10.0, 1.0, 1.0], 2).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.dim(), 2);
        assert_eq!(set.row(1), &[10.0, 10.0]);
        assert_eq!(set.rows(1..3), &[10.0, 10.0, 1.0, 1.0]);
        assert_eq!(set.iter().count(), 3);
    }

    #[test]
    fn test_from_rows() {
        let set = PointSet::from_rows(&[[1.0, 2.0], [3.0, 4.0]], 2).unwrap();
        assert_eq!(set.as_flat(), &[1.0, 2.0, 3.0, 4.0]);

        let err = PointSet::from_rows(&[vec![1.0, 2.0], vec![3.0]], 2).unwrap_err();
        assert!(matches!(
            err,
            KnnError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_ragged_buffer_rejected() {
        assert!(PointSet::from_flat(vec![1.0, 2.0, 3.0], 2).is_err());
        assert!(PointSet::from_flat(vec![1.0], 0).is_err());
    }

    #[test]
    fn test_empty_set() {
        let set = PointSet::from_flat(Vec::new(), 3).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.rows(0..0), &[] as &[f32]);
    }

    #[test]
    fn test_zeroed() {
        let set = PointSet::zeroed(4, 3, "test").unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.memory_bytes(), 4 * 3 * 4);
        assert!(set.as_flat().iter().all(|&v| v == 0.0));
    }
}
