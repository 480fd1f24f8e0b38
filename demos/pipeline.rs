//! Three-stage pipeline: a parser stage feeds an enricher and an auditor,
//! and a final stage runs behind both.
//!
//!     cargo run --example pipeline

use ringbus::{HandlerError, RingBuilder, Sequence, WaitStrategy};

#[derive(Default)]
struct Trade {
    symbol_id: u32,
    quantity: u32,
}

fn main() -> Result<(), ringbus::RingError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let mut builder = RingBuilder::<Trade>::new(1024).wait_strategy(WaitStrategy::blocking());

    let parse = builder.add_handler(
        |trade: &Trade, seq: Sequence, _eob: bool| -> Result<(), HandlerError> {
            if trade.quantity == 0 {
                return Err(format!("empty trade at {seq}").into());
            }
            Ok(())
        },
        &[],
    )?;

    let enrich = builder.add_handler(
        |_trade: &Trade, _seq: Sequence, _eob: bool| -> Result<(), HandlerError> { Ok(()) },
        &[parse],
    )?;

    let audit = builder.add_handler(
        |trade: &Trade, seq: Sequence, _eob: bool| -> Result<(), HandlerError> {
            if seq % 1000 == 0 {
                println!("audit: seq {seq} symbol {}", trade.symbol_id);
            }
            Ok(())
        },
        &[parse],
    )?;

    builder.add_handler(
        |_trade: &Trade, seq: Sequence, eob: bool| -> Result<(), HandlerError> {
            if eob {
                println!("settled through {seq}");
            }
            Ok(())
        },
        &[enrich, audit],
    )?;

    let (mut ring, producer) = builder.build()?;
    ring.start()?;

    for i in 0..10_000u32 {
        producer.publish_with(|trade| {
            trade.symbol_id = i % 17;
            trade.quantity = 1 + i % 100;
        })?;
    }

    ring.shutdown(true);
    Ok(())
}
