use crate::core::sequence::{AtomicSequence, Sequence};
use crate::core::wait::WaitStrategy;
use crate::error::RingError;
use crate::ring::graph::HandlerId;
use crate::ring::processor::{state, EventProcessor};
use crate::ring::sequencer::Sequencer;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Coordinator facade: owns the processor threads and the ring-wide
/// lifecycle. Built by [`crate::RingBuilder`], paired with a
/// [`crate::Producer`] handle for the write side.
pub struct Ring<T> {
    sequencer: Arc<Sequencer>,
    wait: Arc<WaitStrategy>,
    alert: Arc<AtomicBool>,
    /// Processors not yet moved onto their threads.
    pending: Vec<EventProcessor<T>>,
    threads: Vec<JoinHandle<()>>,
    states: Vec<Arc<AtomicU8>>,
    consumed: Vec<Arc<AtomicSequence>>,
    started: bool,
    shut_down: bool,
}

impl<T: Send + Sync + 'static> Ring<T> {
    pub(crate) fn new(
        sequencer: Arc<Sequencer>,
        wait: Arc<WaitStrategy>,
        alert: Arc<AtomicBool>,
        pending: Vec<EventProcessor<T>>,
        states: Vec<Arc<AtomicU8>>,
        consumed: Vec<Arc<AtomicSequence>>,
    ) -> Self {
        Self {
            sequencer,
            wait,
            alert,
            pending,
            threads: Vec::new(),
            states,
            consumed,
            started: false,
            shut_down: false,
        }
    }

    /// Launches one named thread per registered processor.
    pub fn start(&mut self) -> Result<(), RingError> {
        if self.started {
            return Err(RingError::AlreadyStarted);
        }
        self.started = true;

        for (index, processor) in self.pending.drain(..).enumerate() {
            let handle = std::thread::Builder::new()
                .name(format!("ringbus-{index}"))
                .spawn(move || processor.run())?;
            self.threads.push(handle);
        }

        debug!(
            processors = self.threads.len(),
            capacity = self.sequencer.capacity(),
            "ring started"
        );
        Ok(())
    }

    /// Signals every processor to halt and joins their threads.
    ///
    /// With `drain = true` the call first waits until every live processor
    /// has consumed everything published so far; with `drain = false`
    /// processors stop at their next wait boundary (at most one granted
    /// batch later). Producers observe `Closed` from the moment this is
    /// called either way. Idempotent.
    pub fn shutdown(&mut self, drain: bool) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.sequencer.close();

        if drain && self.started {
            let target = self.sequencer.published_cursor();
            loop {
                let drained = self
                    .states
                    .iter()
                    .zip(&self.consumed)
                    .all(|(st, consumed)| {
                        // Halted processors are out of drain accounting;
                        // they will never advance again.
                        st.load(Ordering::Acquire) >= state::HALTED || consumed.get() >= target
                    });
                if drained {
                    break;
                }
                self.wait.signal();
                std::thread::yield_now();
            }
        }

        self.alert.store(true, Ordering::Release);
        self.wait.signal();

        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("processor thread panicked during shutdown");
            }
        }

        debug!(drain, cursor = self.sequencer.published_cursor(), "ring shut down");
    }

    /// Highest sequence published so far (-1 before the first publish).
    pub fn published_cursor(&self) -> Sequence {
        self.sequencer.published_cursor()
    }

    /// Minimum consumed sequence across all registered consumers.
    pub fn gating_sequence(&self) -> Sequence {
        self.sequencer.gating_sequence()
    }

    /// Highest sequence the given handler has finished processing.
    pub fn consumed_sequence(&self, handler: HandlerId) -> Option<Sequence> {
        self.consumed.get(handler.index()).map(|c| c.get())
    }

    pub fn capacity(&self) -> usize {
        self.sequencer.capacity()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Backstop for rings dropped without an explicit shutdown. Not
        // draining: the owner had its chance to ask for that.
        if !self.shut_down {
            self.shut_down = true;
            self.sequencer.close();
            self.alert.store(true, Ordering::Release);
            self.wait.signal();
            for handle in self.threads.drain(..) {
                if handle.join().is_err() {
                    warn!("processor thread panicked during shutdown");
                }
            }
        }
    }
}
