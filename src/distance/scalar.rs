//! Scalar squared-distance kernels.
//! Baseline for the SIMD paths and the fallback on other architectures.

/// Squared Euclidean distance: sum((a[i] - b[i])^2).
///
/// No square root is taken; the squared value orders neighbors identically.
#[inline]
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Point dimensions must match");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Squared Euclidean distance accumulated in double precision.
///
/// Used by the verification oracle so that its distances do not share the
/// rounding behavior of the `f32` kernels under test.
#[inline]
pub fn squared_distance_f64(a: &[f32], b: &[f32]) -> f64 {
    assert_eq!(a.len(), b.len(), "Point dimensions must match");

    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = f64::from(x) - f64::from(y);
            diff * diff
        })
        .sum()
}
