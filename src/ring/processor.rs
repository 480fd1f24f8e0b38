use crate::core::sequence::{AtomicSequence, Sequence};
use crate::ring::barrier::SequenceBarrier;
use crate::ring::graph::HandlerId;
use crate::ring::slots::SlotStore;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Error type handlers report. Boxed so handlers can surface anything
/// without the ring dictating their error stack.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A consumer's per-event callback.
///
/// `end_of_batch` is true for the last event of the batch the barrier made
/// available in one wake-up, which is the natural point to flush any
/// per-batch state downstream.
pub trait EventHandler<T>: Send {
    fn on_event(
        &mut self,
        event: &T,
        sequence: Sequence,
        end_of_batch: bool,
    ) -> Result<(), HandlerError>;
}

impl<T, F> EventHandler<T> for F
where
    F: FnMut(&T, Sequence, bool) -> Result<(), HandlerError> + Send,
{
    fn on_event(
        &mut self,
        event: &T,
        sequence: Sequence,
        end_of_batch: bool,
    ) -> Result<(), HandlerError> {
        self(event, sequence, end_of_batch)
    }
}

/// What a processor does after its handler failed on one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDirective {
    /// Skip the failed event and keep processing. The skip is explicit and
    /// logged; it is never silent data loss.
    Continue,
    /// Stop this processor. Its consumed sequence stays where it halted, so
    /// producers eventually observe the ring as full rather than
    /// overwriting anything.
    Halt,
}

/// Hook invoked on every handler failure. Failures are never swallowed: the
/// default hook logs and continues, and a host may supply its own to halt
/// instead or to route errors elsewhere.
pub trait ErrorHook: Send + Sync {
    fn on_handler_error(
        &self,
        handler: HandlerId,
        sequence: Sequence,
        err: &HandlerError,
    ) -> ErrorDirective;
}

/// Default policy: log the failure at error level and move on.
pub struct LogAndContinue;

impl ErrorHook for LogAndContinue {
    fn on_handler_error(
        &self,
        handler: HandlerId,
        sequence: Sequence,
        err: &HandlerError,
    ) -> ErrorDirective {
        error!(handler = handler.index(), sequence, %err, "handler failed, skipping event");
        ErrorDirective::Continue
    }
}

/// Opt-in policy: log the failure and halt the processor.
pub struct HaltOnError;

impl ErrorHook for HaltOnError {
    fn on_handler_error(
        &self,
        handler: HandlerId,
        sequence: Sequence,
        err: &HandlerError,
    ) -> ErrorDirective {
        error!(handler = handler.index(), sequence, %err, "handler failed, halting processor");
        ErrorDirective::Halt
    }
}

/// Processor lifecycle states, stored in a shared `AtomicU8` so the
/// coordinator can observe progress without touching the thread.
pub(crate) mod state {
    pub const IDLE: u8 = 0;
    pub const RUNNING: u8 = 1;
    pub const HALTED: u8 = 2;
    pub const STOPPED: u8 = 3;
}

/// Drives one consumer: waits on its barrier, reads newly available slots
/// in order, invokes the handler, and advances its consumed sequence.
pub(crate) struct EventProcessor<T> {
    id: HandlerId,
    handler: Box<dyn EventHandler<T>>,
    barrier: SequenceBarrier,
    slots: Arc<SlotStore<T>>,
    consumed: Arc<AtomicSequence>,
    state: Arc<AtomicU8>,
    hook: Arc<dyn ErrorHook>,
}

impl<T: Send + Sync> EventProcessor<T> {
    pub(crate) fn new(
        id: HandlerId,
        handler: Box<dyn EventHandler<T>>,
        barrier: SequenceBarrier,
        slots: Arc<SlotStore<T>>,
        consumed: Arc<AtomicSequence>,
        state: Arc<AtomicU8>,
        hook: Arc<dyn ErrorHook>,
    ) -> Self {
        Self {
            id,
            handler,
            barrier,
            slots,
            consumed,
            state,
            hook,
        }
    }

    /// The processor loop. Runs on its own thread until alerted (shutdown)
    /// or halted by the error hook. Exits only at a wait or batch boundary;
    /// it never abandons an event mid-handler.
    pub(crate) fn run(mut self) {
        self.state.store(state::RUNNING, Ordering::Release);
        debug!(handler = self.id.index(), "processor running");

        let mut next = self.consumed.get() + 1;
        let exit_state = 'processing: loop {
            let available = match self.barrier.wait_for(next) {
                Ok(available) => available,
                // Alerted: cooperative shutdown, not a failure.
                Err(_) => break state::STOPPED,
            };

            while next <= available {
                let end_of_batch = next == available;
                // SAFETY: the barrier reported `next` as available, so the
                // publish of this sequence happened-before our acquire of
                // the cursor (or of an upstream consumed sequence), and no
                // producer may reclaim the slot until our consumed
                // sequence passes it.
                let event = unsafe { &*self.slots.slot(next) };

                if let Err(err) = self.handler.on_event(event, next, end_of_batch) {
                    let directive = self.hook.on_handler_error(self.id, next, &err);
                    if directive == ErrorDirective::Halt {
                        // Count the failed event as consumed so upstream
                        // accounting stays coherent, then stop.
                        self.consumed.set(next);
                        break 'processing state::HALTED;
                    }
                }

                self.consumed.set(next);
                next += 1;
            }
        };

        self.state.store(exit_state, Ordering::Release);
        debug!(
            handler = self.id.index(),
            consumed = self.consumed.get(),
            halted = exit_state == state::HALTED,
            "processor stopped"
        );
    }
}
