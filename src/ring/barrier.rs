use crate::core::sequence::{minimum_sequence, AtomicSequence, Sequence};
use crate::core::wait::WaitStrategy;
use crate::error::RingError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Read-side view of how far a consumer may safely read.
///
/// A root barrier tracks the producer cursor; a chained barrier tracks the
/// consumed sequences of its upstream consumers instead, which are bounded
/// by the cursor by invariant, so a downstream consumer can never observe a
/// sequence its upstream has not finished.
pub(crate) struct SequenceBarrier {
    cursor: Arc<AtomicSequence>,
    /// Upstream consumed sequences this barrier is gated on. Empty means
    /// the barrier reads straight from the cursor.
    dependencies: Vec<Arc<AtomicSequence>>,
    wait: Arc<WaitStrategy>,
    alert: Arc<AtomicBool>,
}

impl SequenceBarrier {
    pub(crate) fn new(
        cursor: Arc<AtomicSequence>,
        dependencies: Vec<Arc<AtomicSequence>>,
        wait: Arc<WaitStrategy>,
        alert: Arc<AtomicBool>,
    ) -> Self {
        Self {
            cursor,
            dependencies,
            wait,
            alert,
        }
    }

    /// Waits until a sequence `>= desired` is available and returns the
    /// highest available one, letting the caller drain a whole batch per
    /// wake-up. Returns `Err(Alerted)` promptly once shutdown is signalled.
    pub(crate) fn wait_for(&self, desired: Sequence) -> Result<Sequence, RingError> {
        let mut spins = 0;
        loop {
            if self.alert.load(Ordering::Acquire) {
                return Err(RingError::Alerted);
            }

            let available = if self.dependencies.is_empty() {
                self.cursor.get()
            } else {
                minimum_sequence(&self.dependencies, Sequence::MAX)
            };

            if available >= desired {
                return Ok(available);
            }

            self.wait.idle(&mut spins);
        }
    }
}
