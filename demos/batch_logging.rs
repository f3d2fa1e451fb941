//! Batched delivery example
//!
//! Demonstrates the asynchronous batch writer: the size threshold, the quiet
//! period, and the final drain on close.
//!
//! Run with: cargo run --example batch_logging

use rust_event_logger::prelude::*;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    println!("=== Rust Event Logger - Batch Logging Example ===\n");

    let memory = MemoryWriter::new();
    let batch = AsyncBatchWriter::builder(WriterHandle::concurrent(memory.clone()))
        .batch_size(100)
        .flush_timeout(Duration::from_millis(200))
        .build()?;
    let batch = std::sync::Arc::new(batch);
    let logger = Logger::builder()
        .writer(WriterHandle::shared(batch.clone()))
        .build()?;

    println!("1. Size threshold:");
    let start = Instant::now();
    for i in 0..250 {
        logger
            .event(Severity::Information, "Batched event")
            .property("seq", i)
            .write()?;
    }
    println!("   enqueued 250 events in {:?}", start.elapsed());
    thread::sleep(Duration::from_millis(50));
    println!(
        "   delivered so far: {} (pending: {})",
        memory.len(),
        batch.pending()
    );

    println!("\n2. Quiet period:");
    thread::sleep(Duration::from_millis(300));
    println!("   delivered after the quiet period: {}", memory.len());

    println!("\n3. Close drains what is left:");
    for _ in 0..5 {
        logger.warning("Late event")?;
    }
    logger.close()?;
    println!("   delivered after close: {}", memory.len());

    let metrics = batch.metrics();
    println!(
        "\n   batches: {}, delivered: {}, failed: {}",
        metrics.batches(),
        metrics.delivered(),
        metrics.failed()
    );

    println!("\n4. Batched console output configured from JSON:");
    let config = PipelineConfig::from_json(
        r#"{ "default_source": "batch_logging", "batch": { "batch_size": 10, "flush_timeout_ms": 50 } }"#,
    )?;
    let console = Logger::from_config(&config, WriterHandle::exclusive(ConsoleWriter::new()))?;
    for i in 0..3 {
        console
            .event(Severity::Information, "Console batch")
            .property("seq", i)
            .write()?;
    }
    console.close()?;

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
