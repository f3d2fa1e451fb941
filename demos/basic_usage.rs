//! Basic logger usage example
//!
//! Demonstrates the console writer, severity shortcuts, structured properties
//! and the two filtering stages.
//!
//! Run with: cargo run --example basic_usage

use rust_event_logger::prelude::*;
use rust_event_logger::{info, warn};

fn main() -> Result<()> {
    println!("=== Rust Event Logger - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .writer(WriterHandle::exclusive(ConsoleWriter::new()))
        .default_source("basic_usage")
        .build()?;

    println!("1. Logging at different severities:");
    logger.trace("This is a trace event")?;
    logger.debug("This is a debug event")?;
    logger.information("This is an information event")?;
    logger.warning("This is a warning event")?;
    logger.error("This is an error event")?;
    logger.critical("This is a critical event")?;

    println!("\n2. Structured properties:");
    logger
        .event(Severity::Information, "Order placed")
        .category("orders")
        .property("order_id", 1042)
        .property("amount", 99.5)
        .property("express", true)
        .write()?;
    logger
        .event(Severity::Error, "Payment declined")
        .category("payments")
        .fault(std::io::Error::other("card expired"))
        .write()?;

    println!("\n3. Macros capture the calling location:");
    let port = 8080;
    info!(logger, "Server listening on port {}", port)?;
    warn!(logger, "Retry attempt {} of {}", 3, 5)?;

    println!("\n4. Pre-allocation severity filter (Warning and above):");
    let filtered = Logger::builder()
        .writer(WriterHandle::exclusive(ConsoleWriter::new()))
        .pre_filter(SeverityFilter::new(Severity::Warning))
        .build()?;
    filtered.debug("Debug event (hidden)")?;
    filtered.information("Information event (hidden)")?;
    filtered.warning("Warning event (visible)")?;
    println!(
        "   pre-filtered: {}, records taken from pool: {}",
        filtered.metrics().pre_filtered(),
        filtered.record_pool_metrics().taken()
    );

    println!("\n5. Context providers:");
    let context = LoggerContext::new();
    context.set("request_id", "req-7f3a");
    let enriched = Logger::builder()
        .writer(WriterHandle::exclusive(ConsoleWriter::new()))
        .context_provider(StaticPropertiesProvider::new().with_property("service", "checkout"))
        .context_provider(ContextPropertiesProvider::new(context.clone()))
        .build()?;
    enriched.information("Request accepted")?;
    {
        let _guard = context.scoped("step", "validate");
        enriched.information("Validating cart")?;
    }
    enriched.information("Request finished")?;

    logger.flush()?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
