//! Launching a group of ranks on their own threads.

use super::Communicator;
use crate::error::{KnnError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

/// Run `body` once per rank, each on a dedicated thread, and collect the
/// per-rank results in rank order.
///
/// Every rank executes the same program (SPMD); `body` branches on
/// [`Communicator::rank`] where roles differ. If any rank fails, every other
/// rank is aborted and the first failure is returned, not the abort notices
/// it caused on the other ranks.
pub fn run_group<R, F>(size: usize, body: F) -> Result<Vec<R>>
where
    R: Send,
    F: Fn(&mut Communicator) -> Result<R> + Sync,
{
    let comms = Communicator::group(size)?;
    let first_failure = OnceLock::new();

    let outcomes: Vec<Result<R>> = std::thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|mut comm| {
                let rank = comm.rank();
                let body = &body;
                let first_failure = &first_failure;

                let handle = std::thread::Builder::new()
                    .name(format!("rank-{}", rank))
                    .spawn_scoped(scope, move || {
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut comm)))
                            .unwrap_or(Err(KnnError::WorkerPanicked { rank }));

                        match &outcome {
                            Ok(_) => comm.finish(),
                            Err(err) if err.is_abort_echo() => comm.finish(),
                            Err(err) => {
                                let _ = first_failure.set(rank);
                                tracing::error!(rank, error = %err, "rank failed, aborting job");
                                comm.abort(&err.to_string());
                            }
                        }
                        outcome
                    });
                (rank, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(rank, handle)| match handle {
                Ok(handle) => handle
                    .join()
                    .unwrap_or(Err(KnnError::WorkerPanicked { rank })),
                Err(err) => {
                    let _ = first_failure.set(rank);
                    Err(KnnError::transport(rank, format!("failed to spawn rank: {}", err)))
                }
            })
            .collect()
    });

    let mut values = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(value) => values.push(value),
            Err(err) => errors.push((rank, err)),
        }
    }

    if errors.is_empty() {
        return Ok(values);
    }

    let culprit = first_failure.get().copied();
    let pos = errors
        .iter()
        .position(|(rank, _)| Some(*rank) == culprit)
        .unwrap_or(0);
    Err(errors.swap_remove(pos).1)
}
