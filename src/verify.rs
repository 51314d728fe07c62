//! Brute-force verification of a result matrix.
//!
//! The oracle recomputes every query's neighbors independently of the
//! selector under test: distances in `f64`, selection with the standard
//! library's `BinaryHeap`. Rows are then compared block by block, where a
//! block is a run of distances equal within [`TIE_EPSILON`]; inside a block
//! only the set of indices has to agree, since the order among ties is
//! unspecified.
//!
//! [`TIE_EPSILON`]: crate::constants::verify::TIE_EPSILON

use crate::constants::verify::{MAX_REPORTED_MISMATCHES, TIE_EPSILON};
use crate::distance::scalar::squared_distance_f64;
use crate::error::{KnnError, Result};
use crate::points::PointSet;
use crate::result::ResultMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A reference point with its exact distance, ordered by distance.
#[derive(Clone, Copy)]
struct ScoredPoint {
    index: u32,
    distance: f64,
}

impl PartialEq for ScoredPoint {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for ScoredPoint {}

impl PartialOrd for ScoredPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on distance: peek() is the current worst kept neighbor.
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// A row whose neighbors disagree with the brute-force answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMismatch {
    /// Query row.
    pub row: usize,
    /// Indices found in the result matrix.
    pub returned: Vec<u32>,
    /// Indices found by brute force.
    pub expected: Vec<u32>,
}

/// Outcome of checking a whole result matrix.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Number of query rows checked.
    pub queries: usize,
    /// Neighbors compared per row.
    pub effective_k: usize,
    /// Rows whose neighbors differ from brute force.
    pub mismatched_rows: usize,
    /// Rows whose distances are not non-decreasing.
    pub order_violations: usize,
    /// Rows containing an index outside the reference set.
    pub out_of_range_rows: usize,
    /// Details of the first mismatched rows, in row order.
    pub mismatches: Vec<RowMismatch>,
}

impl VerificationReport {
    /// True when every row matches brute force.
    pub fn is_ok(&self) -> bool {
        self.mismatched_rows == 0 && self.out_of_range_rows == 0
    }

    /// Create a human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Verification: {} queries checked, k_eff={}",
            self.queries, self.effective_k
        );
        if self.out_of_range_rows > 0 {
            out.push_str(&format!(
                "\n  Out-of-range indices in {} rows",
                self.out_of_range_rows
            ));
        }
        if self.order_violations > 0 {
            out.push_str(&format!(
                "\n  Ascending order violated in {} rows (eps={:e})",
                self.order_violations, TIE_EPSILON
            ));
        }
        if self.mismatched_rows == 0 {
            out.push_str(&format!(
                "\n  OK: all {} neighbor lists match brute force (within tolerance)",
                self.queries
            ));
        } else {
            out.push_str(&format!(
                "\n  FAILED: {}/{} queries differ",
                self.mismatched_rows, self.queries
            ));
            for m in &self.mismatches {
                out.push_str(&format!(
                    "\n  row {}: returned {:?}, brute force {:?}",
                    m.row, m.returned, m.expected
                ));
            }
        }
        out
    }
}

struct RowCheck {
    order_ok: bool,
    range_ok: bool,
    mismatch: Option<RowMismatch>,
}

/// Check `matrix` against a brute-force recomputation.
///
/// `k` is the requested neighbor count; rows are compared over
/// `min(k, reference.len())` entries, which must equal `matrix.k()`.
///
/// # Errors
/// Returns an error if the matrix shape does not fit the inputs.
pub fn verify_knn(
    queries: &PointSet,
    reference: &PointSet,
    k: usize,
    matrix: &ResultMatrix,
) -> Result<VerificationReport> {
    if k == 0 || reference.is_empty() {
        return Err(KnnError::invalid_parameter(
            "verification needs k > 0 and a non-empty reference set",
        ));
    }
    if queries.dim() != reference.dim() {
        return Err(KnnError::dimension_mismatch(reference.dim(), queries.dim()));
    }

    let k_eff = k.min(reference.len());
    if k_eff != k {
        tracing::warn!(k, n = reference.len(), k_eff, "k exceeds reference set; verifying k_eff");
    }
    if matrix.k() != k_eff {
        return Err(KnnError::dimension_mismatch(k_eff, matrix.k()));
    }
    if matrix.rows() != queries.len() {
        return Err(KnnError::dimension_mismatch(queries.len(), matrix.rows()));
    }

    let checks: Vec<RowCheck> = (0..queries.len())
        .into_par_iter()
        .map(|row| check_row(row, queries.row(row), reference, k_eff, matrix.row(row)))
        .collect();

    let mut report = VerificationReport {
        queries: queries.len(),
        effective_k: k_eff,
        ..Default::default()
    };
    for check in checks {
        if !check.order_ok {
            report.order_violations += 1;
        }
        if !check.range_ok {
            report.out_of_range_rows += 1;
        }
        if let Some(mismatch) = check.mismatch {
            report.mismatched_rows += 1;
            if report.mismatches.len() < MAX_REPORTED_MISMATCHES {
                report.mismatches.push(mismatch);
            }
        }
    }
    Ok(report)
}

/// Exact k nearest neighbors of `query`, ascending by distance.
fn brute_force(query: &[f32], reference: &PointSet, k: usize) -> Vec<ScoredPoint> {
    let mut heap: BinaryHeap<ScoredPoint> = BinaryHeap::with_capacity(k);

    for (index, point) in reference.iter().enumerate() {
        let distance = squared_distance_f64(query, point);
        let candidate = ScoredPoint {
            index: index as u32,
            distance,
        };

        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if distance + TIE_EPSILON < worst.distance {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_sorted_vec()
}

fn check_row(
    row: usize,
    query: &[f32],
    reference: &PointSet,
    k: usize,
    returned: &[u32],
) -> RowCheck {
    let n = reference.len();
    let in_range = |idx: u32| (idx as usize) < n;

    let got_dist: Vec<f64> = returned
        .iter()
        .map(|&idx| {
            if in_range(idx) {
                squared_distance_f64(query, reference.row(idx as usize))
            } else {
                f64::INFINITY
            }
        })
        .collect();

    let range_ok = returned.iter().all(|&idx| in_range(idx));

    let order_ok = returned
        .windows(2)
        .zip(got_dist.windows(2))
        .filter(|(idx, _)| in_range(idx[0]) && in_range(idx[1]))
        .all(|(_, d)| d[1] + TIE_EPSILON >= d[0]);

    let expected = brute_force(query, reference, k);
    let exp_idx: Vec<u32> = expected.iter().map(|p| p.index).collect();
    let exp_dist: Vec<f64> = expected.iter().map(|p| p.distance).collect();

    let mismatch = (!tie_blocks_match(&exp_idx, &exp_dist, returned, &got_dist)).then(|| {
        RowMismatch {
            row,
            returned: returned.to_vec(),
            expected: exp_idx.clone(),
        }
    });

    RowCheck {
        order_ok,
        range_ok,
        mismatch,
    }
}

/// End of the run of distances tied with `dist[start]`.
fn tie_block_end(dist: &[f64], start: usize) -> usize {
    let base = dist[start];
    let mut end = start + 1;
    while end < dist.len() && (dist[end] - base).abs() <= TIE_EPSILON {
        end += 1;
    }
    end
}

/// Compare two ascending neighbor lists, treating tied blocks as sets.
fn tie_blocks_match(a_idx: &[u32], a_dist: &[f64], b_idx: &[u32], b_dist: &[f64]) -> bool {
    if a_idx.len() != b_idx.len() {
        return false;
    }

    let len = a_idx.len();
    let (mut i, mut j) = (0, 0);
    while i < len && j < len {
        let i_end = tie_block_end(a_dist, i);
        let j_end = tie_block_end(b_dist, j);

        if (a_dist[i] - b_dist[j]).abs() > TIE_EPSILON || i_end - i != j_end - j {
            return false;
        }

        let block_b = &b_idx[j..j_end];
        let mut used = vec![false; block_b.len()];
        for &idx in &a_idx[i..i_end] {
            match (0..block_b.len()).find(|&u| !used[u] && block_b[u] == idx) {
                Some(u) => used[u] = true,
                None => return false,
            }
        }

        i = i_end;
        j = j_end;
    }
    i == len && j == len
}
