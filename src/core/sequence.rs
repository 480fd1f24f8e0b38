use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};

/// Logical position of an event in the ring.
///
/// Sequences count published events since construction and never wrap in
/// practice (an i64 at one event per nanosecond outlives the host). The slot
/// index is derived from a sequence with a mask; the two are distinct.
pub type Sequence = i64;

/// Value a sequence counter holds before anything has been claimed or
/// consumed.
pub const INITIAL_SEQUENCE: Sequence = -1;

/// A cache-line padded atomic sequence counter.
///
/// Each counter has a single logical writer (the producer side for the
/// cursor, one processor for its consumed sequence) and any number of
/// readers. Writers publish with a release store, readers observe with an
/// acquire load; this pair is what carries the happens-before edge from a
/// slot write to the consumer that reads it.
#[derive(Debug)]
pub struct AtomicSequence {
    value: CachePadded<AtomicI64>,
}

impl AtomicSequence {
    pub fn new(value: Sequence) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(value)),
        }
    }

    /// Acquire load. Pairs with `set` on the writer side.
    #[inline]
    pub fn get(&self) -> Sequence {
        self.value.load(Ordering::Acquire)
    }

    /// Release store. Everything written before this call is visible to a
    /// thread that subsequently observes the new value via `get`.
    #[inline]
    pub fn set(&self, value: Sequence) {
        self.value.store(value, Ordering::Release);
    }

    /// Relaxed load, for counters only the calling thread writes.
    #[inline]
    pub fn relaxed(&self) -> Sequence {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn compare_exchange(&self, current: Sequence, next: Sequence) -> Result<Sequence, Sequence> {
        self.value
            .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
    }
}

impl Default for AtomicSequence {
    fn default() -> Self {
        Self::new(INITIAL_SEQUENCE)
    }
}

/// Minimum over a set of consumed-sequence counters, or `fallback` when the
/// set is empty (no consumers registered means no gating).
#[inline]
pub(crate) fn minimum_sequence(sequences: &[std::sync::Arc<AtomicSequence>], fallback: Sequence) -> Sequence {
    sequences
        .iter()
        .map(|s| s.get())
        .min()
        .unwrap_or(fallback)
}
