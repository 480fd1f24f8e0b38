use crate::core::sequence::{minimum_sequence, AtomicSequence, Sequence};
use crate::core::wait::WaitStrategy;
use crate::error::RingError;
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Whether one thread or many may claim sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerMode {
    /// One claiming thread; claims are a plain store, no CAS on the hot
    /// path. The producer handle enforces this by being neither `Sync` nor
    /// cloneable in this mode.
    Single,
    /// Any number of claiming threads; claims go through a CAS loop and
    /// publication goes through per-sequence availability stamps so the
    /// cursor only ever advances over a contiguous prefix.
    Multi,
}

/// A contiguous run of claimed sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceBatch {
    start: Sequence,
    end: Sequence,
}

impl SequenceBatch {
    pub(crate) fn new(start: Sequence, end: Sequence) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// First claimed sequence.
    pub fn start(&self) -> Sequence {
        self.start
    }

    /// Last claimed sequence.
    pub fn end(&self) -> Sequence {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<Sequence> {
        self.start..=self.end
    }
}

impl IntoIterator for SequenceBatch {
    type Item = Sequence;
    type IntoIter = std::ops::RangeInclusive<Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.start..=self.end
    }
}

/// Hands out claim sequences to producers and tracks how far the consumer
/// side has progressed (gating).
///
/// The cursor is the highest sequence visible to consumers and is always
/// contiguous: in single-producer mode publishes arrive in order by
/// contract, in multi-producer mode each publish stamps its sequences as
/// available and then advances the cursor over the longest contiguous
/// stamped prefix.
pub(crate) struct Sequencer {
    capacity: i64,
    mode: ProducerMode,
    /// Highest claimed sequence. Single writer in `Single` mode, CAS
    /// contended in `Multi` mode.
    claimed: AtomicSequence,
    /// Highest published-and-contiguous sequence. Read by every barrier.
    cursor: Arc<AtomicSequence>,
    /// Multi-producer availability stamps, one per slot, holding the last
    /// sequence published into that slot (-1 before first use). Empty in
    /// single-producer mode.
    published: Box<[CachePadded<AtomicI64>]>,
    /// Consumed-sequence counters of every registered consumer. Cold path:
    /// written during wiring, read-locked on gating checks.
    gating: RwLock<Vec<Arc<AtomicSequence>>>,
    closed: AtomicBool,
    wait: Arc<WaitStrategy>,
}

impl Sequencer {
    pub(crate) fn new(capacity: usize, mode: ProducerMode, wait: Arc<WaitStrategy>) -> Self {
        debug_assert!(capacity > 0 && capacity.is_power_of_two());

        let published = match mode {
            ProducerMode::Single => Vec::new(),
            ProducerMode::Multi => (0..capacity)
                .map(|_| CachePadded::new(AtomicI64::new(-1)))
                .collect(),
        };

        Self {
            capacity: capacity as i64,
            mode,
            claimed: AtomicSequence::default(),
            cursor: Arc::new(AtomicSequence::default()),
            published: published.into_boxed_slice(),
            gating: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
            wait,
        }
    }

    pub(crate) fn mode(&self) -> ProducerMode {
        self.mode
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity as usize
    }

    pub(crate) fn cursor(&self) -> Arc<AtomicSequence> {
        Arc::clone(&self.cursor)
    }

    /// Adds a consumer's consumed-sequence counter to the gating set.
    ///
    /// Must happen before producers start publishing: a consumer registered
    /// after publication has begun is gated only from that point on, and
    /// slots already recycled are gone. This grace window is a documented
    /// limitation, not silently corrected.
    pub(crate) fn register_consumer(&self, consumed: Arc<AtomicSequence>) {
        self.gating.write().push(consumed);
    }

    /// `min` over all registered consumers' consumed sequences, or the
    /// cursor when no consumer is registered (meaning: no gating).
    pub(crate) fn gating_sequence(&self) -> Sequence {
        minimum_sequence(&self.gating.read(), self.cursor.get())
    }

    fn gating_floor(&self, fallback: Sequence) -> Sequence {
        minimum_sequence(&self.gating.read(), fallback)
    }

    fn check_batch(&self, n: usize) -> Result<i64, RingError> {
        if n == 0 || n as i64 > self.capacity {
            return Err(RingError::BatchTooLarge {
                requested: n,
                capacity: self.capacity as usize,
            });
        }
        Ok(n as i64)
    }

    /// Claims the next `n` sequences, waiting (per the ring's wait
    /// strategy) while the claim would overwrite an unconsumed slot.
    ///
    /// `cached_gate` is the calling handle's private cache of the last
    /// observed gating minimum; it lets the fast path skip re-reading every
    /// consumer counter while the ring is far from full.
    pub(crate) fn next(&self, n: usize, cached_gate: &Cell<Sequence>) -> Result<SequenceBatch, RingError> {
        let n = self.check_batch(n)?;
        match self.mode {
            ProducerMode::Single => self.next_single(n, cached_gate, true),
            ProducerMode::Multi => self.next_multi(n, cached_gate, true),
        }
    }

    /// Non-blocking claim: `Err(Full)` instead of waiting.
    pub(crate) fn try_next(&self, n: usize, cached_gate: &Cell<Sequence>) -> Result<SequenceBatch, RingError> {
        let n = self.check_batch(n)?;
        match self.mode {
            ProducerMode::Single => self.next_single(n, cached_gate, false),
            ProducerMode::Multi => self.next_multi(n, cached_gate, false),
        }
    }

    fn next_single(
        &self,
        n: i64,
        cached_gate: &Cell<Sequence>,
        block: bool,
    ) -> Result<SequenceBatch, RingError> {
        // Only the single producer thread writes `claimed` in this mode.
        let current = self.claimed.relaxed();
        let end = current + n;
        let wrap = end - self.capacity;

        if wrap > cached_gate.get() {
            let mut spins = 0;
            loop {
                if self.is_closed() {
                    return Err(RingError::Closed);
                }
                let min = self.gating_floor(current);
                if wrap <= min {
                    cached_gate.set(min);
                    break;
                }
                if !block {
                    return Err(RingError::Full);
                }
                self.wait.idle(&mut spins);
            }
        } else if self.is_closed() {
            return Err(RingError::Closed);
        }

        self.claimed.set(end);
        Ok(SequenceBatch::new(current + 1, end))
    }

    fn next_multi(
        &self,
        n: i64,
        cached_gate: &Cell<Sequence>,
        block: bool,
    ) -> Result<SequenceBatch, RingError> {
        let mut spins = 0;
        loop {
            if self.is_closed() {
                return Err(RingError::Closed);
            }

            let current = self.claimed.get();
            let end = current + n;
            let wrap = end - self.capacity;

            if wrap > cached_gate.get() {
                let min = self.gating_floor(current);
                cached_gate.set(min);
                if wrap > min {
                    if !block {
                        return Err(RingError::Full);
                    }
                    self.wait.idle(&mut spins);
                    continue;
                }
            }

            if self.claimed.compare_exchange(current, end).is_ok() {
                return Ok(SequenceBatch::new(current + 1, end));
            }
            // Lost the claim race, not full; retry immediately.
            std::hint::spin_loop();
        }
    }

    /// Makes `[start, end]` visible to consumers.
    ///
    /// Single-producer mode relies on publishes arriving in claim order and
    /// advances the cursor directly. Multi-producer mode stamps each
    /// sequence as available, then advances the cursor over the longest
    /// contiguous stamped prefix; a publish that lands ahead of a gap
    /// leaves the cursor where it is and the eventual publisher of the gap
    /// carries it forward.
    pub(crate) fn publish(&self, start: Sequence, end: Sequence) {
        debug_assert!(start <= end);
        // A phantom publication would advance the cursor over a slot nobody
        // wrote and let a later claim hand the same sequence out twice, so
        // this check stays on in release builds.
        assert!(
            end <= self.claimed.get(),
            "published sequence {end} was never claimed"
        );
        match self.mode {
            ProducerMode::Single => {
                debug_assert_eq!(self.cursor.relaxed(), start - 1, "single-producer publishes must arrive in claim order");
                self.cursor.set(end);
            }
            ProducerMode::Multi => {
                let mask = (self.capacity - 1) as usize;
                for seq in start..=end {
                    self.published[(seq as usize) & mask].store(seq, Ordering::Release);
                }
                self.advance_cursor();
            }
        }
        self.wait.signal();
    }

    #[inline]
    fn is_stamped(&self, seq: Sequence) -> bool {
        let mask = (self.capacity - 1) as usize;
        self.published[(seq as usize) & mask].load(Ordering::Acquire) == seq
    }

    fn advance_cursor(&self) {
        loop {
            let current = self.cursor.get();
            let mut high = current;
            while self.is_stamped(high + 1) {
                high += 1;
            }
            if high == current {
                return;
            }
            // On CAS success re-scan: stamps may have appeared behind our
            // back between the scan and the swap. On failure another
            // publisher advanced for us; re-scan as well.
            let _ = self.cursor.compare_exchange(current, high);
        }
    }

    /// Highest sequence consumers may read.
    pub(crate) fn published_cursor(&self) -> Sequence {
        self.cursor.get()
    }

    /// Marks the ring closed. Producers observe `Closed` at their next
    /// claim; waiters parked on the blocking strategy are woken.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wait.signal();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
