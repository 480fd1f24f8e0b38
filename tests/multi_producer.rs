use ringbus::{
    EventHandler, HandlerError, ProducerMode, RingBuilder, RingError, Sequence, WaitStrategy,
};
use serial_test::serial;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;

const PRODUCERS: u64 = 4;
const PER_PRODUCER: u64 = 1000;

/// Payload encodes (producer id, per-producer counter) so the consumer can
/// check loss, duplication and per-producer ordering independently.
fn encode(producer: u64, counter: u64) -> u64 {
    producer << 32 | counter
}

struct Demux {
    streams: Arc<Mutex<HashMap<u64, Vec<u64>>>>,
}

impl EventHandler<u64> for Demux {
    fn on_event(&mut self, event: &u64, _seq: Sequence, _eob: bool) -> Result<(), HandlerError> {
        let producer = event >> 32;
        let counter = event & 0xFFFF_FFFF;
        self.streams
            .lock()
            .unwrap()
            .entry(producer)
            .or_default()
            .push(counter);
        Ok(())
    }
}

fn run_stress(strategy: WaitStrategy, capacity: usize) {
    let streams = Arc::new(Mutex::new(HashMap::new()));

    let mut builder = RingBuilder::<u64>::new(capacity)
        .producer_mode(ProducerMode::Multi)
        .wait_strategy(strategy);
    builder
        .add_handler(Demux { streams: Arc::clone(&streams) }, &[])
        .unwrap();
    let (mut ring, producer) = builder.build().unwrap();
    ring.start().unwrap();

    let mut publishers = Vec::new();
    for id in 0..PRODUCERS {
        let handle = producer.try_clone().unwrap();
        publishers.push(thread::spawn(move || {
            for counter in 0..PER_PRODUCER {
                // Random jitter shakes out claim/publish interleavings.
                if fastrand::u8(..) < 8 {
                    thread::yield_now();
                }
                handle
                    .publish_with(|slot| *slot = encode(id, counter))
                    .unwrap();
            }
        }));
    }
    drop(producer);

    for publisher in publishers {
        publisher.join().unwrap();
    }
    ring.shutdown(true);

    let streams = streams.lock().unwrap();
    assert_eq!(streams.len(), PRODUCERS as usize);
    for id in 0..PRODUCERS {
        let stream = &streams[&id];
        assert_eq!(
            stream.len() as u64,
            PER_PRODUCER,
            "producer {id} lost or duplicated events"
        );
        // Per-producer order must survive the shared ring.
        assert!(
            stream.windows(2).all(|w| w[0] < w[1]),
            "producer {id} events reordered"
        );
    }
}

#[test]
#[serial]
fn four_producers_one_consumer_busy_spin() {
    run_stress(WaitStrategy::busy_spin(), 64);
}

#[test]
#[serial]
fn four_producers_one_consumer_yielding_small_ring() {
    // A small ring maximizes wrap-around pressure and gating contention.
    run_stress(WaitStrategy::yielding(), 8);
}

#[test]
#[serial]
fn four_producers_two_consumers_blocking() {
    let streams_a = Arc::new(Mutex::new(HashMap::new()));
    let streams_b = Arc::new(Mutex::new(HashMap::new()));

    let mut builder = RingBuilder::<u64>::new(32)
        .producer_mode(ProducerMode::Multi)
        .wait_strategy(WaitStrategy::blocking());
    builder
        .add_handler(Demux { streams: Arc::clone(&streams_a) }, &[])
        .unwrap();
    builder
        .add_handler(Demux { streams: Arc::clone(&streams_b) }, &[])
        .unwrap();
    let (mut ring, producer) = builder.build().unwrap();
    ring.start().unwrap();

    let mut publishers = Vec::new();
    for id in 0..PRODUCERS {
        let handle = producer.try_clone().unwrap();
        publishers.push(thread::spawn(move || {
            for counter in 0..PER_PRODUCER {
                handle
                    .publish_with(|slot| *slot = encode(id, counter))
                    .unwrap();
            }
        }));
    }
    drop(producer);

    for publisher in publishers {
        publisher.join().unwrap();
    }
    ring.shutdown(true);

    for streams in [&streams_a, &streams_b] {
        let streams = streams.lock().unwrap();
        for id in 0..PRODUCERS {
            assert_eq!(streams[&id].len() as u64, PER_PRODUCER);
            assert!(streams[&id].windows(2).all(|w| w[0] < w[1]));
        }
    }
}

#[test]
#[should_panic(expected = "never claimed")]
fn publishing_without_a_claim_is_refused() {
    // Were this to slip through, the cursor would pass an unwritten slot
    // and a later claim would hand sequence 0 out a second time.
    let mut builder = RingBuilder::<u64>::new(4).producer_mode(ProducerMode::Multi);
    builder
        .add_handler(
            |_: &u64, _: Sequence, _: bool| -> Result<(), HandlerError> { Ok(()) },
            &[],
        )
        .unwrap();
    let (_ring, producer) = builder.build().unwrap();

    unsafe { producer.publish(0) };
}

#[test]
fn single_mode_handle_cannot_be_cloned() {
    let mut builder = RingBuilder::<u64>::new(8);
    builder
        .add_handler(
            |_: &u64, _: Sequence, _: bool| -> Result<(), HandlerError> { Ok(()) },
            &[],
        )
        .unwrap();
    let (_ring, producer) = builder.build().unwrap();
    assert!(matches!(producer.try_clone(), Err(RingError::WrongMode)));
}

#[test]
fn multi_mode_handle_clones() {
    let mut builder = RingBuilder::<u64>::new(8).producer_mode(ProducerMode::Multi);
    builder
        .add_handler(
            |_: &u64, _: Sequence, _: bool| -> Result<(), HandlerError> { Ok(()) },
            &[],
        )
        .unwrap();
    let (mut ring, producer) = builder.build().unwrap();
    ring.start().unwrap();

    let clone = producer.try_clone().unwrap();
    producer.publish_with(|slot| *slot = 1).unwrap();
    clone.publish_with(|slot| *slot = 2).unwrap();

    ring.shutdown(true);
    assert_eq!(ring.published_cursor(), 1);
}
