//! # Retrying fetch pipeline
//!
//! Demonstrates:
//! - A flaky source retried on runtime errors only, with a delay before every run
//! - Attached continuations passing data down the chain
//! - A failure branch for errors the retry policy gives up on
//! - A custom subscriber printing lifecycle events
//! - Driving the engine from a Tokio `LocalSet`
//!
//! Run with: `cargo run --example retry_pipeline`

use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use flowvisor::{
    ErrorKind, Event, EventKind, ExecFn, Execution, LocalScheduler, MapFn, Payload, Provider,
    StreamError, StreamType, Subscribe,
};

/// Prints the events worth seeing in a demo.
struct Printer;

#[async_trait(?Send)]
impl Subscribe for Printer {
    async fn on_event(&self, e: &Event) {
        let stream = e.stream.map(|s| s.to_string()).unwrap_or_default();
        match e.kind {
            EventKind::DelayScheduled => {
                println!("  [delay]  stream={stream} ms={:?}", e.delay_ms.unwrap_or(0));
            }
            EventKind::RetryScheduled => {
                println!(
                    "  [retry]  stream={stream} run={} err={:?}",
                    e.attempt.unwrap_or(0),
                    e.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::StreamDead => println!("  [dead]   stream={stream}"),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "printer"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let local = tokio::task::LocalSet::new();
    local.run_until(run()).await
}

async fn run() -> Result<(), Box<dyn Error>> {
    let subscribers: Vec<Rc<dyn Subscribe>> = vec![Rc::new(Printer)];
    let provider = Provider::builder(Rc::new(LocalScheduler::new()))
        .with_subscribers(subscribers)
        .build();

    let attempts = Rc::new(Cell::new(0u32));
    let a = attempts.clone();
    let source = provider.create(
        ExecFn::new(move |h, _| {
            a.set(a.get() + 1);
            match a.get() {
                1 => Err(StreamError::runtime("connection reset")),
                2 => Err(StreamError::runtime("timeout")),
                n => {
                    h.close(Payload::from(format!("payload #{n}")));
                    Ok(Execution::Pending)
                }
            }
        }),
        StreamType::Abortable,
    );
    source
        .retry_on([ErrorKind::Runtime], Some(3))?
        .delay(Duration::from_millis(200))?;
    source.failure(MapFn::new(|p: Payload| {
        println!("  gave up: {:?}", p.as_error().map(StreamError::message));
        Ok(p)
    }))?;

    let parsed = source.attach(MapFn::new(|p: Payload| {
        let text = p.as_str().unwrap_or_default().to_uppercase();
        println!("  parsed: {text}");
        Ok(Payload::from(text))
    }))?;

    let stored = Rc::new(Cell::new(false));
    let s = stored.clone();
    parsed.attach(MapFn::new(move |p: Payload| {
        println!("  stored: {:?}", p.as_str());
        s.set(true);
        Ok(p)
    }))?;
    drop((source, parsed));

    while !stored.get() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    // Let disposal and subscriber delivery catch up.
    tokio::time::sleep(Duration::from_millis(10)).await;

    println!(
        "attempts={} created={} existing={} active={}",
        attempts.get(),
        provider.total_created(),
        provider.total_existing(),
        provider.total_active()
    );
    Ok(())
}
