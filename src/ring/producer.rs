use crate::core::sequence::{Sequence, INITIAL_SEQUENCE};
use crate::error::RingError;
use crate::ring::sequencer::{ProducerMode, SequenceBatch, Sequencer};
use crate::ring::slots::SlotStore;
use std::cell::Cell;
use std::sync::Arc;

/// Write-side handle for a ring.
///
/// In single-producer mode there is exactly one handle, it is `Send` but
/// not `Sync` and cannot be cloned, so the no-CAS claim path is enforced by
/// the type system. In multi-producer mode `try_clone` hands out additional
/// handles, one per producing thread.
///
/// The claim/publish cycle is:
///
/// ```ignore
/// let seq = producer.claim_one()?;
/// unsafe {
///     producer.write(seq, |slot| *slot = payload);
///     producer.publish(seq);
/// }
/// ```
///
/// or, fused and entirely safe:
///
/// ```ignore
/// producer.publish_with(|slot| *slot = payload)?;
/// ```
pub struct Producer<T> {
    sequencer: Arc<Sequencer>,
    slots: Arc<SlotStore<T>>,
    /// Per-handle cache of the last observed gating minimum. `Cell` keeps
    /// the handle `!Sync`, which is exactly right: a handle belongs to one
    /// thread, clones carry their own cache.
    cached_gate: Cell<Sequence>,
}

impl<T: Send + Sync> Producer<T> {
    pub(crate) fn new(sequencer: Arc<Sequencer>, slots: Arc<SlotStore<T>>) -> Self {
        Self {
            sequencer,
            slots,
            cached_gate: Cell::new(INITIAL_SEQUENCE),
        }
    }

    /// Claims the next sequence, waiting per the ring's wait strategy while
    /// the ring is full. `Err(Closed)` after shutdown.
    pub fn claim_one(&self) -> Result<Sequence, RingError> {
        self.sequencer.next(1, &self.cached_gate).map(|b| b.end())
    }

    /// Non-blocking claim: `Err(Full)` when gating forbids it right now.
    pub fn try_claim_one(&self) -> Result<Sequence, RingError> {
        self.sequencer.try_next(1, &self.cached_gate).map(|b| b.end())
    }

    /// Claims `n` contiguous sequences in one gating check.
    pub fn claim_batch(&self, n: usize) -> Result<SequenceBatch, RingError> {
        self.sequencer.next(n, &self.cached_gate)
    }

    /// Non-blocking batch claim.
    pub fn try_claim_batch(&self, n: usize) -> Result<SequenceBatch, RingError> {
        self.sequencer.try_next(n, &self.cached_gate)
    }

    /// Writes the slot for a claimed sequence.
    ///
    /// # Safety
    /// `sequence` must have been claimed by this handle and not yet
    /// published. Writing outside that window aliases a slot a consumer may
    /// be reading.
    pub unsafe fn write<R>(&self, sequence: Sequence, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut *self.slots.slot(sequence))
    }

    /// Publishes one claimed sequence, making it visible to consumers.
    /// Single-producer rings must publish in claim order. A sequence that
    /// was never claimed panics rather than publishing a phantom slot.
    ///
    /// # Safety
    /// `sequence` must have been claimed by this handle, written via
    /// [`write`](Self::write), and not yet published. Publishing another
    /// handle's claim exposes a slot its owner may still be writing.
    pub unsafe fn publish(&self, sequence: Sequence) {
        self.sequencer.publish(sequence, sequence);
    }

    /// Publishes a whole claimed batch at once.
    ///
    /// # Safety
    /// Same contract as [`publish`](Self::publish), for every sequence in
    /// the batch.
    pub unsafe fn publish_batch(&self, batch: SequenceBatch) {
        self.sequencer.publish(batch.start(), batch.end());
    }

    /// Claims, writes and publishes one event. The closure runs inside the
    /// exclusive claim window, so this entry point is safe.
    pub fn publish_with(&self, f: impl FnOnce(&mut T)) -> Result<Sequence, RingError> {
        let sequence = self.claim_one()?;
        // SAFETY: claimed above by this handle; the window is ours.
        unsafe {
            self.write(sequence, f);
            self.publish(sequence);
        }
        Ok(sequence)
    }

    /// Non-blocking variant of `publish_with`.
    pub fn try_publish_with(&self, f: impl FnOnce(&mut T)) -> Result<Sequence, RingError> {
        let sequence = self.try_claim_one()?;
        // SAFETY: claimed above by this handle; the window is ours.
        unsafe {
            self.write(sequence, f);
            self.publish(sequence);
        }
        Ok(sequence)
    }

    /// Claims `n` sequences, fills each slot via the closure, publishes the
    /// batch.
    pub fn publish_batch_with(
        &self,
        n: usize,
        mut f: impl FnMut(Sequence, &mut T),
    ) -> Result<SequenceBatch, RingError> {
        let batch = self.claim_batch(n)?;
        // SAFETY: every sequence in the batch was claimed above by this
        // handle and stays unpublished until publish_batch.
        unsafe {
            for sequence in batch {
                self.write(sequence, |slot| f(sequence, slot));
            }
            self.publish_batch(batch);
        }
        Ok(batch)
    }

    /// Another handle for this ring. `Err(WrongMode)` on a single-producer
    /// ring, where a second claiming thread would break the claim protocol.
    pub fn try_clone(&self) -> Result<Producer<T>, RingError> {
        match self.sequencer.mode() {
            ProducerMode::Single => Err(RingError::WrongMode),
            ProducerMode::Multi => Ok(Producer::new(
                Arc::clone(&self.sequencer),
                Arc::clone(&self.slots),
            )),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }
}
