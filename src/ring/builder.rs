use crate::core::sequence::AtomicSequence;
use crate::core::wait::WaitStrategy;
use crate::error::RingError;
use crate::ring::barrier::SequenceBarrier;
use crate::ring::coordinator::Ring;
use crate::ring::graph::{DependencyGraph, HandlerId};
use crate::ring::processor::{state, ErrorHook, EventHandler, EventProcessor, LogAndContinue};
use crate::ring::producer::Producer;
use crate::ring::sequencer::{ProducerMode, Sequencer};
use crate::ring::slots::SlotStore;
use std::sync::atomic::{AtomicBool, AtomicU8};
use std::sync::Arc;

/// Wires a ring: capacity, wait strategy, producer mode, the handler
/// dependency graph and the error policy, then `build()` validates the lot
/// and yields the coordinator plus the producer handle.
///
/// ```ignore
/// let mut builder = RingBuilder::<u64>::new(1024)
///     .wait_strategy(WaitStrategy::blocking())
///     .producer_mode(ProducerMode::Single);
/// let parse = builder.add_handler(parser, &[])?;
/// let _audit = builder.add_handler(auditor, &[parse])?;
/// let (mut ring, producer) = builder.build()?;
/// ring.start()?;
/// ```
pub struct RingBuilder<T> {
    capacity: usize,
    wait: WaitStrategy,
    mode: ProducerMode,
    factory: Box<dyn FnMut() -> T>,
    handlers: Vec<Box<dyn EventHandler<T>>>,
    graph: DependencyGraph,
    hook: Arc<dyn ErrorHook>,
}

impl<T: Send + Sync + Default + 'static> RingBuilder<T> {
    /// Builder for events with a `Default` payload. `capacity` must be a
    /// positive power of two (checked at `build`).
    pub fn new(capacity: usize) -> Self {
        Self::with_event_factory(capacity, T::default)
    }
}

impl<T: Send + Sync + 'static> RingBuilder<T> {
    /// Builder with an explicit slot factory, for payloads without a
    /// `Default` or that need per-slot preallocation (buffers, pools).
    pub fn with_event_factory(capacity: usize, factory: impl FnMut() -> T + 'static) -> Self {
        Self {
            capacity,
            wait: WaitStrategy::default(),
            mode: ProducerMode::Single,
            factory: Box::new(factory),
            handlers: Vec::new(),
            graph: DependencyGraph::default(),
            hook: Arc::new(LogAndContinue),
        }
    }

    pub fn wait_strategy(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    pub fn producer_mode(mut self, mode: ProducerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replaces the default log-and-continue handler failure policy.
    pub fn error_hook(mut self, hook: Arc<dyn ErrorHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Registers a handler gated on `depends_on` (empty: gated on the
    /// producer cursor only). Returns the id downstream handlers use to
    /// depend on this one.
    pub fn add_handler(
        &mut self,
        handler: impl EventHandler<T> + 'static,
        depends_on: &[HandlerId],
    ) -> Result<HandlerId, RingError> {
        for dep in depends_on {
            if dep.index() >= self.graph.len() {
                return Err(RingError::UnknownHandler(*dep));
            }
        }

        let id = self.graph.add_node();
        self.handlers.push(Box::new(handler));
        for dep in depends_on {
            self.graph.add_dependency(id, *dep)?;
        }
        Ok(id)
    }

    /// Adds an edge between two already-registered handlers. Cycles are
    /// caught at `build`, not here.
    pub fn add_dependency(&mut self, handler: HandlerId, upstream: HandlerId) -> Result<(), RingError> {
        self.graph.add_dependency(handler, upstream)
    }

    /// Validates capacity and the dependency graph, preallocates every
    /// slot, wires one barrier per handler and registers every consumer
    /// for gating. No thread is spawned here; that happens in
    /// [`Ring::start`].
    pub fn build(mut self) -> Result<(Ring<T>, Producer<T>), RingError> {
        if self.capacity == 0 || !self.capacity.is_power_of_two() {
            return Err(RingError::InvalidCapacity(self.capacity));
        }
        self.graph.check_acyclic()?;

        let wait = Arc::new(self.wait);
        let sequencer = Arc::new(Sequencer::new(self.capacity, self.mode, Arc::clone(&wait)));
        let slots = Arc::new(SlotStore::new(self.capacity, &mut self.factory));
        let alert = Arc::new(AtomicBool::new(false));
        let cursor = sequencer.cursor();

        let consumed: Vec<Arc<AtomicSequence>> = (0..self.handlers.len())
            .map(|_| Arc::new(AtomicSequence::default()))
            .collect();
        let states: Vec<Arc<AtomicU8>> = (0..self.handlers.len())
            .map(|_| Arc::new(AtomicU8::new(state::IDLE)))
            .collect();

        let mut processors = Vec::with_capacity(self.handlers.len());
        for (index, handler) in self.handlers.into_iter().enumerate() {
            let id = HandlerId(index);
            let dependencies = self
                .graph
                .dependencies_of(id)
                .iter()
                .map(|&dep| Arc::clone(&consumed[dep]))
                .collect();

            let barrier = SequenceBarrier::new(
                Arc::clone(&cursor),
                dependencies,
                Arc::clone(&wait),
                Arc::clone(&alert),
            );

            sequencer.register_consumer(Arc::clone(&consumed[index]));
            processors.push(EventProcessor::new(
                id,
                handler,
                barrier,
                Arc::clone(&slots),
                Arc::clone(&consumed[index]),
                Arc::clone(&states[index]),
                Arc::clone(&self.hook),
            ));
        }

        let producer = Producer::new(Arc::clone(&sequencer), Arc::clone(&slots));
        let ring = Ring::new(sequencer, wait, alert, processors, states, consumed);
        Ok((ring, producer))
    }
}
