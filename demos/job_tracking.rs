//! Job tracking example
//!
//! Demonstrates job tokens, their correlated start and terminal events, child
//! jobs and job-scoped child loggers.
//!
//! Run with: cargo run --example job_tracking

use rust_event_logger::prelude::*;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Event Logger - Job Tracking Example ===\n");

    let logger = Logger::builder()
        .writer(WriterHandle::exclusive(ConsoleWriter::new()))
        .default_source("job_tracking")
        .build()?;

    println!("1. A job that completes:");
    let job = logger.job("Import customers").property("file", "customers.csv").begin()?;
    let job_logger = job.logger()?;
    job_logger.information("Parsed 1200 rows")?;
    job.complete()?;

    println!("\n2. A job that records a fault:");
    {
        let mut job = logger.begin_job("Sync inventory")?;
        job.record_fault(std::io::Error::other("warehouse API timed out"))?;
        // Dropping the token writes the terminal event
    }

    println!("\n3. A cancelled job:");
    let mut job = logger.begin_job("Rebuild search index")?;
    job.cancel();
    drop(job);

    println!("\n4. A job over its expected duration:");
    let job = logger
        .job("Generate report")
        .expected_duration(Duration::from_millis(10))
        .begin()?;
    thread::sleep(Duration::from_millis(30));
    job.complete()?;

    println!("\n5. Nested jobs:");
    let parent = logger.job("Nightly batch").property("tenant", "acme").begin()?;
    for step in ["extract", "transform", "load"] {
        let child = parent.begin_child(step)?;
        child.complete()?;
    }
    parent.complete()?;

    println!(
        "\n   job states created: {}, reused: {:.0}%",
        logger.job_pool_metrics().created(),
        logger.job_pool_metrics().reuse_ratio() * 100.0
    );
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
