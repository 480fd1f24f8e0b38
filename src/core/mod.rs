pub mod sequence;
pub mod wait;

pub use sequence::{AtomicSequence, Sequence, INITIAL_SEQUENCE};
pub use wait::WaitStrategy;
