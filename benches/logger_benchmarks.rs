//! Criterion benchmarks for rust_event_logger

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_event_logger::prelude::*;
use std::time::Duration;

/// Destination that drops everything
struct NullWriter;

impl ConcurrentWriter for NullWriter {
    fn write(&self, record: &EventRecord) -> Result<()> {
        black_box(record);
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

fn null_logger() -> Logger {
    Logger::builder()
        .writer(WriterHandle::concurrent(NullWriter))
        .build()
        .unwrap()
}

// ============================================================================
// Pipeline Benchmarks
// ============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger();

    group.bench_function("disabled", |b| {
        let disabled = Logger::builder()
            .writer(WriterHandle::concurrent(NullWriter))
            .enabled(false)
            .build()
            .unwrap();
        b.iter(|| disabled.information(black_box("Muted message")).unwrap());
    });

    group.bench_function("information", |b| {
        b.iter(|| logger.information(black_box("Info message")).unwrap());
    });

    group.bench_function("with_properties", |b| {
        b.iter(|| {
            logger
                .event(Severity::Information, black_box("Order placed"))
                .category("orders")
                .property("order_id", 1042)
                .property("amount", 99.5)
                .property("express", true)
                .write()
                .unwrap()
        });
    });

    let record = EventRecord::new(Severity::Warning, "Prebuilt event")
        .with_category("bench")
        .with_property("key", "value");
    group.bench_function("write_event", |b| {
        b.iter(|| logger.write_event(black_box(&record)).unwrap());
    });

    group.finish();
}

// ============================================================================
// Filtering Benchmarks
// ============================================================================

fn bench_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtering");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::builder()
        .writer(WriterHandle::concurrent(NullWriter))
        .pre_filter(SeverityFilter::new(Severity::Warning))
        .build()
        .unwrap();

    group.bench_function("pre_filter_reject", |b| {
        b.iter(|| logger.debug(black_box("Filtered message")).unwrap());
    });

    let logger = Logger::builder()
        .writer(WriterHandle::concurrent(NullWriter))
        .post_filter(|record: &EventRecord| Ok(record.category != "noise"))
        .build()
        .unwrap();

    group.bench_function("post_filter_reject", |b| {
        b.iter(|| {
            logger
                .event(Severity::Information, black_box("Filtered message"))
                .category("noise")
                .write()
                .unwrap()
        });
    });

    let sampler = SamplingFilter::new(SamplingConfig::new(0.1));
    group.bench_function("sampling_decision", |b| {
        b.iter(|| black_box(sampler.should_sample(Severity::Information, "bench")));
    });

    group.finish();
}

// ============================================================================
// Enrichment Benchmarks
// ============================================================================

fn bench_enrichment(c: &mut Criterion) {
    let mut group = c.benchmark_group("enrichment");
    group.throughput(Throughput::Elements(1));

    for providers in [1usize, 4, 8] {
        let mut builder = Logger::builder().writer(WriterHandle::concurrent(NullWriter));
        for i in 0..providers {
            builder = builder.context_provider(
                StaticPropertiesProvider::new().with_property(format!("field_{}", i), i),
            );
        }
        let logger = builder.build().unwrap();

        group.bench_with_input(BenchmarkId::new("static_providers", providers), &providers, |b, _| {
            b.iter(|| logger.information(black_box("Enriched message")).unwrap());
        });
    }

    let context = LoggerContext::new();
    context.set("request_id", "r-123");
    context.set("user", "alice");
    let logger = Logger::builder()
        .writer(WriterHandle::concurrent(NullWriter))
        .context_provider(ContextPropertiesProvider::new(context))
        .build()
        .unwrap();

    group.bench_function("context_provider", |b| {
        b.iter(|| logger.information(black_box("Context message")).unwrap());
    });

    group.finish();
}

// ============================================================================
// Pool Benchmarks
// ============================================================================

fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Elements(1));

    for timing in [ReinitTiming::OnTake, ReinitTiming::OnReturn] {
        let pool = ObjectPool::builder(EventRecord::default)
            .timing(timing)
            .reinitializer(EventRecord::clear)
            .build()
            .unwrap();

        group.bench_function(BenchmarkId::new("acquire_release", timing), |b| {
            b.iter(|| {
                let mut record = pool.acquire().unwrap();
                record.set_name(black_box("pooled"));
            });
        });
    }

    group.bench_function("allocate_fresh", |b| {
        b.iter(|| black_box(EventRecord::new(Severity::Information, black_box("fresh"))));
    });

    group.finish();
}

// ============================================================================
// Batching Benchmarks
// ============================================================================

fn bench_batching(c: &mut Criterion) {
    let mut group = c.benchmark_group("batching");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::builder()
        .writer(WriterHandle::concurrent(NullWriter))
        .batched(BatchConfig::new(256, Duration::from_millis(10)))
        .build()
        .unwrap();

    group.bench_function("enqueue", |b| {
        b.iter(|| logger.information(black_box("Batched message")).unwrap());
    });

    let direct = null_logger();
    let records: Vec<_> = (0..64)
        .map(|i| EventRecord::new(Severity::Information, "batch item").with_property("i", i))
        .collect();
    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("write_batch_64", |b| {
        b.iter(|| direct.write_batch(black_box(&records)).unwrap());
    });

    group.finish();
}

// ============================================================================
// Job Benchmarks
// ============================================================================

fn bench_jobs(c: &mut Criterion) {
    let mut group = c.benchmark_group("jobs");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger();

    group.bench_function("begin_complete", |b| {
        b.iter(|| {
            let job = logger.begin_job(black_box("unit of work")).unwrap();
            job.complete().unwrap();
        });
    });

    group.finish();
}

// ============================================================================
// Concurrent Logging Benchmarks
// ============================================================================

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");

    let logger = null_logger();

    group.bench_function("multi_thread_4", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let logger = logger.clone();
                    std::thread::spawn(move || {
                        for _ in 0..100 {
                            logger.information(black_box("Concurrent message")).unwrap();
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_pipeline,
    bench_filtering,
    bench_enrichment,
    bench_pool,
    bench_batching,
    bench_jobs,
    bench_concurrent_logging,
);

criterion_main!(benches);
