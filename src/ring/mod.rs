pub(crate) mod barrier;
pub mod builder;
pub mod coordinator;
pub mod graph;
pub mod processor;
pub mod producer;
pub mod sequencer;
pub(crate) mod slots;

pub use builder::RingBuilder;
pub use coordinator::Ring;
pub use graph::HandlerId;
pub use processor::{ErrorDirective, ErrorHook, EventHandler, HaltOnError, HandlerError, LogAndContinue};
pub use producer::Producer;
pub use sequencer::{ProducerMode, SequenceBatch};
