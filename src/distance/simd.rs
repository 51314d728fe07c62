//! SIMD squared-distance kernels with runtime CPU detection.
//!
//! - **AVX-512** (x86_64): 16 lanes per iteration, behind the `avx512` cargo
//!   feature (nightly Rust only)
//! - **AVX2+FMA** (x86_64): 8 lanes per iteration
//! - **NEON** (aarch64): 4 lanes per iteration
//! - **Scalar**: everything else
//!
//! [`squared_distance`] picks the fastest kernel available on the running CPU.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

use super::scalar;

/// Squared Euclidean distance using AVX-512 intrinsics.
///
/// # Safety
/// The caller must ensure the CPU supports AVX-512F.
#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
#[target_feature(enable = "avx512f")]
#[inline]
pub unsafe fn squared_distance_avx512(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Point dimensions must match");

    let len = a.len();
    let mut acc = _mm512_setzero_ps();
    let mut i = 0;

    while i + 16 <= len {
        let va = _mm512_loadu_ps(a.as_ptr().add(i));
        let vb = _mm512_loadu_ps(b.as_ptr().add(i));
        let diff = _mm512_sub_ps(va, vb);
        acc = _mm512_fmadd_ps(diff, diff, acc);
        i += 16;
    }

    let mut total = _mm512_reduce_add_ps(acc);

    // Tail is at most 15 lanes; scalar beats a masked load here.
    for j in i..len {
        let diff = a[j] - b[j];
        total += diff * diff;
    }

    total
}

/// Squared Euclidean distance using AVX2 and FMA intrinsics.
///
/// # Safety
/// The caller must ensure the CPU supports AVX2 and FMA.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
#[inline]
pub unsafe fn squared_distance_avx2(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Point dimensions must match");

    let len = a.len();
    let mut acc = _mm256_setzero_ps();
    let mut i = 0;

    while i + 8 <= len {
        let va = _mm256_loadu_ps(a.as_ptr().add(i));
        let vb = _mm256_loadu_ps(b.as_ptr().add(i));
        let diff = _mm256_sub_ps(va, vb);
        acc = _mm256_fmadd_ps(diff, diff, acc);
        i += 8;
    }

    let lanes: [f32; 8] = std::mem::transmute(acc);
    let mut total: f32 = lanes.iter().sum();

    for j in i..len {
        let diff = a[j] - b[j];
        total += diff * diff;
    }

    total
}

/// Squared Euclidean distance using NEON intrinsics.
///
/// NEON is part of the aarch64 baseline, so no runtime detection is needed.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn squared_distance_neon(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Point dimensions must match");

    let len = a.len();
    let mut i = 0;
    let mut acc = unsafe { vdupq_n_f32(0.0) };

    while i + 4 <= len {
        unsafe {
            let va = vld1q_f32(a.as_ptr().add(i));
            let vb = vld1q_f32(b.as_ptr().add(i));
            let diff = vsubq_f32(va, vb);
            acc = vfmaq_f32(acc, diff, diff);
        }
        i += 4;
    }

    let mut total = unsafe { vaddvq_f32(acc) };

    for j in i..len {
        let diff = a[j] - b[j];
        total += diff * diff;
    }

    total
}

/// Squared Euclidean distance with automatic CPU feature detection.
///
/// Dispatch order: AVX-512F (feature-gated), AVX2+FMA, NEON, scalar.
#[inline]
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    #[cfg(target_arch = "x86_64")]
    {
        #[cfg(feature = "avx512")]
        {
            if is_x86_feature_detected!("avx512f") {
                // SAFETY: AVX-512F support was just verified.
                return unsafe { squared_distance_avx512(a, b) };
            }
        }
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            // SAFETY: AVX2 and FMA support was just verified.
            return unsafe { squared_distance_avx2(a, b) };
        }
        return scalar::squared_distance(a, b);
    }

    #[cfg(target_arch = "aarch64")]
    {
        return squared_distance_neon(a, b);
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    scalar::squared_distance(a, b)
}
