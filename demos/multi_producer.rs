//! Four producing threads share one ring; a single consumer checks that
//! every event arrives exactly once.
//!
//!     cargo run --example multi_producer

use ringbus::{HandlerError, ProducerMode, RingBuilder, Sequence, WaitStrategy};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

fn main() -> Result<(), ringbus::RingError> {
    tracing_subscriber::fmt().init();

    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 250_000;

    let received = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&received);

    let mut builder = RingBuilder::<u64>::new(4096)
        .producer_mode(ProducerMode::Multi)
        .wait_strategy(WaitStrategy::yielding());
    builder.add_handler(
        move |_event: &u64, _seq: Sequence, _eob: bool| -> Result<(), HandlerError> {
            sink.fetch_add(1, Ordering::Relaxed);
            Ok(())
        },
        &[],
    )?;

    let (mut ring, producer) = builder.build()?;
    ring.start()?;

    let start = std::time::Instant::now();
    let mut threads = Vec::new();
    for id in 0..PRODUCERS {
        let handle = producer.try_clone()?;
        threads.push(thread::spawn(move || {
            for n in 0..PER_PRODUCER {
                handle
                    .publish_with(|slot| *slot = id << 32 | n)
                    .expect("ring closed under our feet");
            }
        }));
    }
    drop(producer);

    for t in threads {
        t.join().unwrap();
    }
    ring.shutdown(true);

    let total = PRODUCERS * PER_PRODUCER;
    let elapsed = start.elapsed();
    assert_eq!(received.load(Ordering::Acquire), total);
    println!(
        "{total} events through 4 producers in {elapsed:?} ({:.2}M events/s)",
        total as f64 / elapsed.as_secs_f64() / 1_000_000.0
    );
    Ok(())
}
