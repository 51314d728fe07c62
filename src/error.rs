//! Error types for forge-knn operations.
//!
//! Every failure is treated as fatal for the whole job: configuration errors
//! stop the run before any data moves, and allocation or transport failures
//! on any rank abort every other rank.

use thiserror::Error;

/// Result type alias using [`KnnError`].
pub type Result<T> = std::result::Result<T, KnnError>;

/// Errors that can occur while planning, distributing or computing a job.
#[derive(Error, Debug)]
pub enum KnnError {
    /// Invalid parameter value provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A point buffer does not match the declared dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension or buffer length.
        expected: usize,
        /// Actual dimension or buffer length.
        actual: usize,
    },

    /// A buffer could not be allocated.
    #[error("allocation failed for {resource}: {bytes} bytes")]
    AllocationFailed {
        /// Name of the buffer being allocated.
        resource: &'static str,
        /// Requested size in bytes.
        bytes: usize,
    },

    /// The message channel to or from a rank failed.
    #[error("transport failure on rank {rank}: {reason}")]
    Transport {
        /// Rank that observed the failure.
        rank: usize,
        /// What went wrong.
        reason: String,
    },

    /// A peer rank aborted the job.
    #[error("job aborted by rank {rank}: {reason}")]
    Aborted {
        /// Rank that initiated the abort.
        rank: usize,
        /// Diagnostic forwarded by that rank.
        reason: String,
    },

    /// A rank's thread panicked.
    #[error("worker rank {rank} panicked")]
    WorkerPanicked {
        /// Rank whose thread panicked.
        rank: usize,
    },

    /// A worker's thread pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl KnnError {
    /// Creates a new `InvalidParameter` error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Creates a new `DimensionMismatch` error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Creates a new `AllocationFailed` error.
    pub fn allocation_failed(resource: &'static str, bytes: usize) -> Self {
        Self::AllocationFailed { resource, bytes }
    }

    /// Creates a new `Transport` error.
    pub fn transport(rank: usize, reason: impl Into<String>) -> Self {
        Self::Transport {
            rank,
            reason: reason.into(),
        }
    }

    /// Creates a new `Aborted` error.
    pub fn aborted(rank: usize, reason: impl Into<String>) -> Self {
        Self::Aborted {
            rank,
            reason: reason.into(),
        }
    }

    /// True when this error only reports that some other rank failed.
    ///
    /// The launcher uses this to surface the root cause instead of the
    /// echoes it produced on the remaining ranks.
    pub fn is_abort_echo(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl From<rayon::ThreadPoolBuildError> for KnnError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(err.to_string())
    }
}

/// Allocate a vector of `len` copies of `value`, reporting failure instead of
/// aborting the process.
pub(crate) fn try_alloc<T: Clone>(len: usize, value: T, resource: &'static str) -> Result<Vec<T>> {
    let bytes = len.saturating_mul(std::mem::size_of::<T>());
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| KnnError::allocation_failed(resource, bytes))?;
    buf.resize(len, value);
    Ok(buf)
}

/// Copy a slice into a freshly allocated vector, reporting allocation failure.
pub(crate) fn try_to_vec<T: Clone>(src: &[T], resource: &'static str) -> Result<Vec<T>> {
    let bytes = std::mem::size_of_val(src);
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len())
        .map_err(|_| KnnError::allocation_failed(resource, bytes))?;
    buf.extend_from_slice(src);
    Ok(buf)
}
