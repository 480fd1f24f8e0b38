//! A lock-free, sequence-gated ring buffer for in-process event pipelines.
//!
//! One producer (or a producer group) claims monotonically increasing
//! sequences, writes into preallocated slots and publishes; any number of
//! consumers read every published event in order, each on its own thread,
//! optionally gated behind other consumers to form a processing DAG.
//! Producers are gated so no slot is recycled before every registered
//! consumer has passed it; there are no locks on the hot path and no
//! allocation after construction.
//!
//! ```no_run
//! use ringbus::{RingBuilder, WaitStrategy};
//!
//! # fn main() -> Result<(), ringbus::RingError> {
//! let mut builder = RingBuilder::<u64>::new(1024).wait_strategy(WaitStrategy::yielding());
//! builder.add_handler(
//!     |event: &u64, sequence: i64, _eob: bool| -> Result<(), ringbus::HandlerError> {
//!         println!("{sequence}: {event}");
//!         Ok(())
//!     },
//!     &[],
//! )?;
//! let (mut ring, producer) = builder.build()?;
//! ring.start()?;
//!
//! for value in 0..10u64 {
//!     producer.publish_with(|slot| *slot = value)?;
//! }
//! ring.shutdown(true);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod ring;

pub use crate::core::sequence::{AtomicSequence, Sequence, INITIAL_SEQUENCE};
pub use crate::core::wait::WaitStrategy;
pub use crate::error::RingError;
pub use crate::ring::{
    ErrorDirective, ErrorHook, EventHandler, HaltOnError, HandlerError, HandlerId, LogAndContinue,
    Producer, ProducerMode, Ring, RingBuilder, SequenceBatch,
};
