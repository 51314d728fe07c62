//! In-process message passing between ranks.
//!
//! A group of `size` ranks is connected all-to-all with `crossbeam-channel`
//! queues. Ranks share no memory: every buffer a rank receives is its own
//! copy. On top of point-to-point send/receive the [`Communicator`] offers
//! the collectives the job needs (broadcast, scatter, scatterv, gather,
//! gatherv, barrier), each of which must be called by every rank in the same
//! order.
//!
//! # Failure
//!
//! A rank that leaves without calling [`Communicator::finish`] (error return
//! or panic) sends an abort to every peer. Any peer blocked in, or later
//! entering, a collective then fails with [`KnnError::Aborted`], so the whole
//! job stops instead of waiting forever.

mod group;
mod message;

pub use group::run_group;
pub use message::{Payload, Transferable};

use crate::error::{try_alloc, try_to_vec, KnnError, Result};
use crate::partition::PartitionPlan;
use crossbeam_channel::{unbounded, Receiver, Sender};
use message::{Envelope, Tag};
use std::collections::VecDeque;

/// One rank's endpoint in a message-passing group.
pub struct Communicator {
    rank: usize,
    size: usize,
    outboxes: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    pending: VecDeque<Envelope>,
    settled: bool,
}

impl Communicator {
    /// Create `size` connected endpoints, one per rank.
    ///
    /// # Errors
    /// Returns an error if `size` is zero.
    pub fn group(size: usize) -> Result<Vec<Self>> {
        if size == 0 {
            return Err(KnnError::invalid_parameter("group size must be > 0"));
        }

        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();

        Ok(receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Self {
                rank,
                size,
                // No sender to ourselves: once every peer is gone the inbox
                // disconnects instead of blocking forever.
                outboxes: senders
                    .iter()
                    .enumerate()
                    .map(|(dest, tx)| (dest != rank).then(|| tx.clone()))
                    .collect(),
                inbox,
                pending: VecDeque::new(),
                settled: false,
            })
            .collect())
    }

    /// This endpoint's rank.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks in the group.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Mark this rank as finished normally; no abort is sent on drop.
    pub fn finish(mut self) {
        self.settled = true;
    }

    /// Abort the job, forwarding `reason` to every peer.
    pub fn abort(mut self, reason: &str) {
        self.notify_abort(reason);
        self.settled = true;
    }

    fn notify_abort(&self, reason: &str) {
        for tx in self.outboxes.iter().flatten() {
            // Peers that already left cannot be told; that is fine.
            let _ = tx.send(Envelope {
                source: self.rank,
                tag: Tag::Abort,
                payload: Payload::Abort(reason.to_string()),
            });
        }
    }

    fn send(&self, dest: usize, tag: Tag, payload: Payload) -> Result<()> {
        let tx = self
            .outboxes
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or_else(|| KnnError::transport(self.rank, format!("no route to rank {}", dest)))?;

        tx.send(Envelope {
            source: self.rank,
            tag,
            payload,
        })
        .map_err(|_| KnnError::transport(self.rank, format!("rank {} has disconnected", dest)))
    }

    fn recv(&mut self, source: usize, tag: Tag) -> Result<Payload> {
        if let Some(pos) = self
            .pending
            .iter()
            .position(|env| env.source == source && env.tag == tag)
        {
            if let Some(env) = self.pending.remove(pos) {
                return Ok(env.payload);
            }
        }

        loop {
            let env = self.inbox.recv().map_err(|_| {
                KnnError::transport(self.rank, "every peer disconnected before the job completed")
            })?;

            if let Payload::Abort(reason) = env.payload {
                // The aborting rank already told everyone.
                self.settled = true;
                return Err(KnnError::aborted(env.source, reason));
            }
            if env.source == source && env.tag == tag {
                return Ok(env.payload);
            }
            self.pending.push_back(env);
        }
    }

    fn recv_value<T: Transferable>(&mut self, source: usize, tag: Tag) -> Result<T> {
        let payload = self.recv(source, tag)?;
        let kind = payload.kind();
        T::from_payload(payload).ok_or_else(|| {
            KnnError::transport(
                self.rank,
                format!("expected {} from rank {}, got {}", T::KIND, source, kind),
            )
        })
    }

    fn check_root(&self, root: usize) -> Result<()> {
        if root >= self.size {
            return Err(KnnError::invalid_parameter(format!(
                "root rank {} outside group of {}",
                root, self.size
            )));
        }
        Ok(())
    }

    /// Send `value` from `root` to every rank; every rank returns it.
    ///
    /// `value` must be `Some` at the root and is ignored elsewhere.
    pub fn broadcast<T: Transferable>(&mut self, root: usize, value: Option<T>) -> Result<T> {
        self.check_root(root)?;
        if self.rank != root {
            return self.recv_value(root, Tag::Broadcast);
        }

        let value = value
            .ok_or_else(|| KnnError::invalid_parameter("broadcast root supplied no value"))?;
        for dest in (0..self.size).filter(|&d| d != root) {
            self.send(dest, Tag::Broadcast, value.duplicate()?.into_payload())?;
        }
        Ok(value)
    }

    /// Replicate a buffer the root keeps on every other rank.
    ///
    /// The root returns `None` and keeps using its own buffer; every other
    /// rank returns its private copy.
    pub fn broadcast_slice<E>(&mut self, root: usize, data: Option<&[E]>) -> Result<Option<Vec<E>>>
    where
        E: Clone,
        Vec<E>: Transferable,
    {
        self.check_root(root)?;
        if self.rank != root {
            return self.recv_value(root, Tag::Broadcast).map(Some);
        }

        let data =
            data.ok_or_else(|| KnnError::invalid_parameter("broadcast root supplied no buffer"))?;
        for dest in (0..self.size).filter(|&d| d != root) {
            let copy = try_to_vec(data, "broadcast replica")?;
            self.send(dest, Tag::Broadcast, copy.into_payload())?;
        }
        Ok(None)
    }

    /// Hand `values[p]` from `root` to rank `p`.
    ///
    /// `values` must hold exactly one entry per rank at the root.
    pub fn scatter<T: Transferable>(&mut self, root: usize, values: Option<Vec<T>>) -> Result<T> {
        self.check_root(root)?;
        if self.rank != root {
            return self.recv_value(root, Tag::Scatter);
        }

        let values =
            values.ok_or_else(|| KnnError::invalid_parameter("scatter root supplied no values"))?;
        if values.len() != self.size {
            return Err(KnnError::dimension_mismatch(self.size, values.len()));
        }

        let mut own = None;
        for (dest, value) in values.into_iter().enumerate() {
            if dest == root {
                own = Some(value);
            } else {
                self.send(dest, Tag::Scatter, value.into_payload())?;
            }
        }
        own.ok_or_else(|| KnnError::transport(self.rank, "scatter lost the root's share"))
    }

    /// Send each rank its contiguous block of `data` as described by `plan`.
    ///
    /// `plan` is in elements (scale a row plan by the row stride first). A
    /// rank whose block is empty receives an empty vector.
    pub fn scatterv<E>(
        &mut self,
        root: usize,
        send: Option<(&[E], &PartitionPlan)>,
    ) -> Result<Vec<E>>
    where
        E: Clone,
        Vec<E>: Transferable,
    {
        self.check_root(root)?;
        if self.rank != root {
            return self.recv_value(root, Tag::Scatter);
        }

        let (data, plan) =
            send.ok_or_else(|| KnnError::invalid_parameter("scatterv root supplied no buffer"))?;
        if plan.parts() != self.size {
            return Err(KnnError::dimension_mismatch(self.size, plan.parts()));
        }
        if plan.total() != data.len() {
            return Err(KnnError::dimension_mismatch(plan.total(), data.len()));
        }

        let mut own = Vec::new();
        for (dest, range) in plan.ranges().enumerate() {
            let block = try_to_vec(&data[range], "query shard")?;
            if dest == root {
                own = block;
            } else {
                self.send(dest, Tag::Scatter, block.into_payload())?;
            }
        }
        Ok(own)
    }

    /// Collect one value from every rank at `root`, ordered by rank.
    ///
    /// Returns `Some` at the root and `None` elsewhere.
    pub fn gather<T: Transferable>(&mut self, root: usize, value: T) -> Result<Option<Vec<T>>> {
        self.check_root(root)?;
        if self.rank != root {
            self.send(root, Tag::Gather, value.into_payload())?;
            return Ok(None);
        }

        let mut own = Some(value);
        let mut values = Vec::with_capacity(self.size);
        for source in 0..self.size {
            if source == root {
                if let Some(v) = own.take() {
                    values.push(v);
                }
            } else {
                values.push(self.recv_value(source, Tag::Gather)?);
            }
        }
        Ok(Some(values))
    }

    /// Assemble every rank's block into one buffer at `root`.
    ///
    /// Rank `p`'s block lands at `plan.range(p)`; `plan` is in elements. A
    /// block whose length disagrees with the plan is a protocol error.
    pub fn gatherv<E>(
        &mut self,
        root: usize,
        local: Vec<E>,
        plan: Option<&PartitionPlan>,
    ) -> Result<Option<Vec<E>>>
    where
        E: Clone + Default,
        Vec<E>: Transferable,
    {
        self.check_root(root)?;
        if self.rank != root {
            self.send(root, Tag::Gather, local.into_payload())?;
            return Ok(None);
        }

        let plan =
            plan.ok_or_else(|| KnnError::invalid_parameter("gatherv root supplied no plan"))?;
        if plan.parts() != self.size {
            return Err(KnnError::dimension_mismatch(self.size, plan.parts()));
        }

        let mut out = try_alloc(plan.total(), E::default(), "gathered result")?;
        let mut own = Some(local);
        for source in 0..self.size {
            let block = if source == root {
                own.take().unwrap_or_default()
            } else {
                self.recv_value::<Vec<E>>(source, Tag::Gather)?
            };

            let range = plan.range(source);
            if block.len() != range.len() {
                return Err(KnnError::transport(
                    self.rank,
                    format!(
                        "rank {} sent {} elements, expected {}",
                        source,
                        block.len(),
                        range.len()
                    ),
                ));
            }
            out[range].clone_from_slice(&block);
        }
        Ok(Some(out))
    }

    /// Block until every rank has reached the barrier.
    pub fn barrier(&mut self) -> Result<()> {
        const COORDINATOR: usize = 0;

        if self.rank == COORDINATOR {
            for source in 1..self.size {
                match self.recv(source, Tag::Barrier)? {
                    Payload::Token => {}
                    other => {
                        return Err(KnnError::transport(
                            self.rank,
                            format!("expected token from rank {}, got {}", source, other.kind()),
                        ))
                    }
                }
            }
            for dest in 1..self.size {
                self.send(dest, Tag::Barrier, Payload::Token)?;
            }
        } else {
            self.send(COORDINATOR, Tag::Barrier, Payload::Token)?;
            self.recv(COORDINATOR, Tag::Barrier)?;
        }
        Ok(())
    }
}

impl Drop for Communicator {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let reason = if std::thread::panicking() {
            format!("rank {} panicked", self.rank)
        } else {
            format!("rank {} left the job early", self.rank)
        };
        self.notify_abort(&reason);
    }
}
