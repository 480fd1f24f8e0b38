use ringbus::{
    EventHandler, HandlerError, HandlerId, RingBuilder, RingError, Sequence, WaitStrategy,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Records the highest sequence it has handled into a shared watermark.
struct Upstream {
    watermark: Arc<AtomicI64>,
}

impl EventHandler<u64> for Upstream {
    fn on_event(&mut self, _event: &u64, seq: Sequence, _eob: bool) -> Result<(), HandlerError> {
        self.watermark.store(seq, Ordering::Release);
        Ok(())
    }
}

/// Asserts its upstream's watermark has already passed every sequence it
/// sees.
struct Downstream {
    upstream_watermark: Arc<AtomicI64>,
    violations: Arc<AtomicI64>,
    seen: Arc<Mutex<Vec<Sequence>>>,
}

impl EventHandler<u64> for Downstream {
    fn on_event(&mut self, _event: &u64, seq: Sequence, _eob: bool) -> Result<(), HandlerError> {
        if self.upstream_watermark.load(Ordering::Acquire) < seq {
            self.violations.fetch_add(1, Ordering::Relaxed);
        }
        self.seen.lock().unwrap().push(seq);
        Ok(())
    }
}

#[test]
fn chained_consumer_never_overtakes_upstream() {
    let watermark = Arc::new(AtomicI64::new(-1));
    let violations = Arc::new(AtomicI64::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut builder = RingBuilder::<u64>::new(8);
    let a = builder
        .add_handler(
            Upstream {
                watermark: Arc::clone(&watermark),
            },
            &[],
        )
        .unwrap();
    builder
        .add_handler(
            Downstream {
                upstream_watermark: Arc::clone(&watermark),
                violations: Arc::clone(&violations),
                seen: Arc::clone(&seen),
            },
            &[a],
        )
        .unwrap();

    let (mut ring, producer) = builder.build().unwrap();
    ring.start().unwrap();

    for value in 0..500u64 {
        producer.publish_with(|slot| *slot = value).unwrap();
    }
    ring.shutdown(true);

    assert_eq!(violations.load(Ordering::Acquire), 0);
    assert_eq!(*seen.lock().unwrap(), (0..500).collect::<Vec<Sequence>>());
}

#[test]
fn diamond_graph_delivers_everything_in_order() {
    // A feeds B and C, D joins behind both.
    let wm_a = Arc::new(AtomicI64::new(-1));
    let wm_b = Arc::new(AtomicI64::new(-1));
    let violations = Arc::new(AtomicI64::new(0));
    let seen_d = Arc::new(Mutex::new(Vec::new()));

    let mut builder = RingBuilder::<u64>::new(16).wait_strategy(WaitStrategy::busy_spin());
    let a = builder
        .add_handler(Upstream { watermark: Arc::clone(&wm_a) }, &[])
        .unwrap();
    let b = builder
        .add_handler(
            Downstream {
                upstream_watermark: Arc::clone(&wm_a),
                violations: Arc::clone(&violations),
                seen: Arc::new(Mutex::new(Vec::new())),
            },
            &[a],
        )
        .unwrap();
    // Track B and C progress for D through extra upstream recorders.
    let c = builder
        .add_handler(Upstream { watermark: Arc::clone(&wm_b) }, &[a])
        .unwrap();
    let _d = builder
        .add_handler(
            Downstream {
                upstream_watermark: Arc::clone(&wm_b),
                violations: Arc::clone(&violations),
                seen: Arc::clone(&seen_d),
            },
            &[b, c],
        )
        .unwrap();

    let (mut ring, producer) = builder.build().unwrap();
    ring.start().unwrap();

    for value in 0..300u64 {
        producer.publish_with(|slot| *slot = value).unwrap();
    }
    ring.shutdown(true);

    assert_eq!(violations.load(Ordering::Acquire), 0);
    assert_eq!(*seen_d.lock().unwrap(), (0..300).collect::<Vec<Sequence>>());
}

#[test]
fn cycle_is_rejected_at_build_and_nothing_starts() {
    let mut builder = RingBuilder::<u64>::new(8);
    let a = builder
        .add_handler(
            |_: &u64, _: Sequence, _: bool| -> Result<(), HandlerError> { Ok(()) },
            &[],
        )
        .unwrap();
    let b = builder
        .add_handler(
            |_: &u64, _: Sequence, _: bool| -> Result<(), HandlerError> { Ok(()) },
            &[a],
        )
        .unwrap();

    // Close the loop: A now also depends on B.
    builder.add_dependency(a, b).unwrap();

    assert!(matches!(builder.build(), Err(RingError::DependencyCycle)));
}

#[test]
fn dependency_on_unknown_handler_is_rejected() {
    // Ids are only meaningful within the builder that issued them; an id
    // from a bigger builder has no counterpart here.
    let noop = |_: &u64, _: Sequence, _: bool| -> Result<(), HandlerError> { Ok(()) };
    let mut other = RingBuilder::<u64>::new(8);
    other.add_handler(noop, &[]).unwrap();
    let foreign: HandlerId = other.add_handler(noop, &[]).unwrap();

    let mut builder = RingBuilder::<u64>::new(8);
    let result = builder.add_handler(noop, &[foreign]);
    assert!(matches!(result, Err(RingError::UnknownHandler(_))));
}

#[test]
fn invalid_capacity_is_rejected() {
    assert!(matches!(
        RingBuilder::<u64>::new(0).build(),
        Err(RingError::InvalidCapacity(0))
    ));
    assert!(matches!(
        RingBuilder::<u64>::new(12).build(),
        Err(RingError::InvalidCapacity(12))
    ));
}
