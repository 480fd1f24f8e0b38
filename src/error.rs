use crate::ring::graph::HandlerId;

/// Everything that can go wrong constructing or operating a ring.
///
/// Recoverable conditions (`Full`) are ordinary result values the caller
/// retries or backs off from; configuration errors (`InvalidCapacity`,
/// `DependencyCycle`, `UnknownHandler`, `BatchTooLarge`, `WrongMode`) abort
/// construction or the offending call; `Closed` is terminal for producers.
/// `Alerted` is the cooperative shutdown handshake between the barrier and
/// its processor and is never returned from producer-side calls.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// A non-blocking claim would overwrite a slot not yet consumed by
    /// every registered consumer. Retry or back off.
    #[error("ring is full")]
    Full,

    /// The ring has been shut down; no further claims are accepted.
    #[error("ring is closed")]
    Closed,

    /// The handler dependency graph contains a cycle.
    #[error("handler dependency graph contains a cycle")]
    DependencyCycle,

    /// A dependency refers to a handler id this builder never issued.
    #[error("unknown handler id {0:?}")]
    UnknownHandler(HandlerId),

    /// Capacity must be a positive power of two.
    #[error("capacity must be a positive power of two, got {0}")]
    InvalidCapacity(usize),

    /// A batch claim asked for more slots than the ring holds (or zero).
    #[error("batch of {requested} events does not fit a ring of capacity {capacity}")]
    BatchTooLarge { requested: usize, capacity: usize },

    /// Operation requires the other producer mode (e.g. cloning the
    /// producer handle of a single-producer ring).
    #[error("operation not supported in this producer mode")]
    WrongMode,

    /// `start` was called on a ring whose processors are already running.
    #[error("ring already started")]
    AlreadyStarted,

    /// Shutdown was requested while waiting. Internal to the consumer side;
    /// a processor treats it as its exit trigger, not as a failure.
    #[error("wait interrupted by shutdown alert")]
    Alerted,

    /// A processor thread could not be spawned.
    #[error("failed to spawn processor thread")]
    Spawn(#[from] std::io::Error),
}
