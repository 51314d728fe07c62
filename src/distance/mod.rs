//! Distance computation between points of equal dimension.
//!
//! Only the squared Euclidean distance is provided: it orders neighbors the
//! same way as the true Euclidean distance and skips the square root.

pub mod scalar;
pub mod simd;

pub use simd::squared_distance;

/// Distance metric used to rank reference points against a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Squared Euclidean distance: sum((a[i] - b[i])^2)
    #[default]
    EuclideanSquared,
}

impl DistanceMetric {
    /// Compute the distance between two points using this metric.
    ///
    /// # Panics
    /// Panics if the points have different dimensions.
    #[inline]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::EuclideanSquared => squared_distance(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_is_squared() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        let dist = DistanceMetric::EuclideanSquared.compute(&a, &b);
        assert!((dist - 25.0).abs() < 1e-5);
    }

    #[test]
    fn test_metric_default() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::EuclideanSquared);
    }
}
