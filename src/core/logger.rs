//! The event pipeline orchestrator
//!
//! Every call runs the same steps on the caller's thread:
//!
//! 1. disabled logger: return immediately
//! 2. pre-allocation filter
//! 3. acquire a pooled record
//! 4. populate it and render the supplied properties
//! 5. run the context providers in registration order
//! 6. post-enrichment filter
//! 7. dispatch to the writer
//! 8. return the record to the pool
//!
//! Faults from any step (including panics in collaborators) are wrapped as
//! pipeline faults and handed to the configured [`ErrorHandler`], whose verdict
//! decides whether the call returns `Err`.

use super::clock::Clock;
use super::config::{BatchConfig, LoggerSettings, PipelineConfig, PoolConfig};
use super::error::{Fault, LoggerError, PipelineStage, Result};
use super::error_policy::{ErrorHandler, ErrorVerdict};
use super::event_record::EventRecord;
use super::filter::{EventFilter, EventHeader, PreFilter};
use super::job::{JobBuilder, JobState, JobToken};
use super::metrics::{LoggerMetrics, PoolMetrics};
use super::pool::{ObjectPool, PooledHandle};
use super::property::PropertyValue;
use super::provider::{ContextProvider, StaticPropertiesProvider};
use super::renderer::RendererMap;
use super::severity::Severity;
use super::writer::WriterHandle;
use crate::writers::{AsyncBatchWriter, ForwardingWriter};
use chrono::{DateTime, Utc};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Run a collaborator call, converting its faults and panics into pipeline faults
fn guarded<T>(stage: PipelineStage, context: &str, call: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result.map_err(|e| LoggerError::pipeline(stage, e)),
        Err(panic_info) => Err(LoggerError::pipeline(
            stage,
            LoggerError::panicked(context, panic_info),
        )),
    }
}

/// A pipeline fault, and whether another logger's policy already saw it
struct Failure {
    error: LoggerError,
    reported: bool,
}

impl From<LoggerError> for Failure {
    fn from(error: LoggerError) -> Self {
        Self {
            error,
            reported: false,
        }
    }
}

/// Call arguments of an event built through [`EventBuilder`]
struct EventDraft<'a> {
    severity: Severity,
    name: &'a str,
    category: &'a str,
    source: Option<&'a str>,
    source_method: Option<&'a str>,
    source_line: Option<u32>,
    timestamp: Option<DateTime<Utc>>,
    properties: Vec<(String, PropertyValue)>,
    fault: Option<Fault>,
}

enum Payload<'a> {
    Draft(EventDraft<'a>),
    Record(&'a EventRecord),
}

impl<'a> Payload<'a> {
    fn header<'b>(&'b self, default_source: &'b str) -> EventHeader<'b> {
        match self {
            Payload::Draft(draft) => EventHeader {
                message: draft.name,
                severity: draft.severity,
                category: draft.category,
                source: draft.source.unwrap_or(default_source),
                source_method: draft.source_method,
            },
            Payload::Record(record) => EventHeader {
                message: &record.name,
                severity: record.severity,
                category: &record.category,
                source: if record.source.is_empty() {
                    default_source
                } else {
                    &record.source
                },
                source_method: record.source_method.as_deref(),
            },
        }
    }
}

struct LoggerInner {
    enabled: AtomicBool,
    closed: AtomicBool,
    writer: WriterHandle,
    settings: LoggerSettings,
    records: ObjectPool<EventRecord>,
    jobs: ObjectPool<JobState>,
    metrics: LoggerMetrics,
    /// Policy of the logger this one forwards to, if any
    upstream_handler: Option<Arc<dyn ErrorHandler>>,
}

impl Drop for LoggerInner {
    fn drop(&mut self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = self.writer.flush() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
        }
    }
}

/// Structured event logger
///
/// Cheap to clone; clones share pools, writer and metrics. Safe to use from any
/// number of threads.
///
/// # Example
///
/// ```
/// use rust_event_logger::prelude::*;
///
/// let memory = MemoryWriter::new();
/// let logger = Logger::builder()
///     .writer(WriterHandle::concurrent(memory.clone()))
///     .default_source("checkout")
///     .build()
///     .unwrap();
///
/// logger
///     .event(Severity::Warning, "payment retried")
///     .category("payments")
///     .property("attempt", 2)
///     .write()
///     .unwrap();
///
/// let records = memory.records();
/// assert_eq!(records[0].source, "checkout");
/// assert_eq!(records[0].property("attempt"), Some(&PropertyValue::from(2)));
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build a logger from a data-only configuration and a destination
    pub fn from_config(config: &PipelineConfig, writer: WriterHandle) -> Result<Logger> {
        Logger::builder().config(config).writer(writer).build()
    }

    /// Build a logger from a settings aggregate
    ///
    /// The settings are cloned; changing `settings` afterwards has no effect.
    pub fn new(settings: &LoggerSettings) -> Result<Logger> {
        Self::assemble(settings, None)
    }

    fn assemble(settings: &LoggerSettings, upstream_handler: Option<Arc<dyn ErrorHandler>>) -> Result<Logger> {
        let settings = settings.clone();
        settings.validate()?;
        let writer = settings
            .writer
            .clone()
            .ok_or_else(|| LoggerError::config("logger", "a destination writer is required"))?;

        let records = ObjectPool::builder(EventRecord::default)
            .name("event record pool")
            .max_size(settings.record_pool.capacity)
            .timing(settings.record_pool.timing)
            .reinitializer(EventRecord::clear)
            .build()?;

        let jobs = ObjectPool::builder(JobState::default)
            .name("job pool")
            .max_size(settings.job_pool.capacity)
            .timing(settings.job_pool.timing)
            .reinitializer(JobState::reset)
            .build()?;

        Ok(Logger {
            inner: Arc::new(LoggerInner {
                enabled: AtomicBool::new(settings.enabled),
                closed: AtomicBool::new(false),
                writer,
                settings,
                records,
                jobs,
                metrics: LoggerMetrics::new(),
                upstream_handler,
            }),
        })
    }

    /// Start building an event
    pub fn event<'a>(&'a self, severity: Severity, name: &'a str) -> EventBuilder<'a> {
        EventBuilder {
            logger: self,
            draft: EventDraft {
                severity,
                name,
                category: "",
                source: None,
                source_method: None,
                source_line: None,
                timestamp: None,
                properties: Vec::new(),
                fault: None,
            },
        }
    }

    pub fn log(&self, severity: Severity, name: &str) -> Result<()> {
        self.event(severity, name).write()
    }

    #[inline]
    pub fn trace(&self, name: &str) -> Result<()> {
        self.log(Severity::Trace, name)
    }

    #[inline]
    pub fn debug(&self, name: &str) -> Result<()> {
        self.log(Severity::Debug, name)
    }

    #[inline]
    pub fn information(&self, name: &str) -> Result<()> {
        self.log(Severity::Information, name)
    }

    #[inline]
    pub fn warning(&self, name: &str) -> Result<()> {
        self.log(Severity::Warning, name)
    }

    #[inline]
    pub fn error(&self, name: &str) -> Result<()> {
        self.log(Severity::Error, name)
    }

    #[inline]
    pub fn critical(&self, name: &str) -> Result<()> {
        self.log(Severity::Critical, name)
    }

    /// Write caller-built structured data
    ///
    /// The record is copied into a pooled record, so `record` itself is never
    /// retained or mutated. A timestamp already present is kept.
    pub fn write_event(&self, record: &EventRecord) -> Result<()> {
        self.process(Payload::Record(record))
    }

    /// Run every record through the pipeline and dispatch the survivors with a
    /// single batch call
    ///
    /// A fault on one record is reported on its own; the remaining records are
    /// still processed unless the error policy rethrows.
    pub fn write_batch(&self, records: &[EventRecord]) -> Result<()> {
        if let Some(early) = self.gate() {
            return early;
        }

        let mut accepted: Vec<PooledHandle<EventRecord>> = Vec::with_capacity(records.len());
        for record in records {
            match self.prepare(Payload::Record(record)) {
                Ok(Some(prepared)) => accepted.push(prepared),
                Ok(None) => {}
                Err(error) => self.report(error)?,
            }
        }
        if accepted.is_empty() {
            return Ok(());
        }

        // The writer takes a contiguous slice; detach the records and hand them
        // back to the pool afterwards.
        let batch: Vec<EventRecord> = accepted
            .into_iter()
            .filter_map(PooledHandle::into_inner)
            .collect();
        let count = batch.len() as u64;
        let result = self.dispatch(|writer| writer.write_batch(&batch));
        for record in batch {
            if let Err(e) = self.inner.records.put(record) {
                eprintln!("[LOGGER WARNING] Failed to return batch record to the pool: {}", e);
            }
        }

        match result {
            Ok(()) => {
                self.inner.metrics.record_written_batch(count);
                Ok(())
            }
            Err(failure) => self.fail(failure),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable the logger; a disabled logger never touches its writer
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Flush the destination writer
    pub fn flush(&self) -> Result<()> {
        match self.inner.writer.flush() {
            Ok(()) => Ok(()),
            Err(e) => self.report(LoggerError::pipeline(PipelineStage::Dispatch, e)),
        }
    }

    /// Close the destination writer
    ///
    /// Later calls report [`LoggerError::LoggerStopped`] through the error
    /// policy. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match self.inner.writer.close() {
            Ok(()) => Ok(()),
            Err(e) => self.report(LoggerError::pipeline(PipelineStage::Dispatch, e)),
        }
    }

    /// Start building a job
    pub fn job<'a>(&'a self, name: &'a str) -> JobBuilder<'a> {
        JobBuilder::new(self, name)
    }

    /// Start a job, writing its Start event
    pub fn begin_job(&self, name: &str) -> Result<JobToken> {
        self.job(name).begin()
    }

    /// Start building a child logger that forwards to this one
    pub fn child(&self) -> ChildLoggerBuilder {
        ChildLoggerBuilder::new(self.clone())
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.metrics
    }

    pub fn record_pool_metrics(&self) -> &PoolMetrics {
        self.inner.records.metrics()
    }

    pub fn job_pool_metrics(&self) -> &PoolMetrics {
        self.inner.jobs.metrics()
    }

    pub fn writer(&self) -> &WriterHandle {
        &self.inner.writer
    }

    pub fn default_source(&self) -> &str {
        &self.inner.settings.default_source
    }

    pub(crate) fn settings(&self) -> &LoggerSettings {
        &self.inner.settings
    }

    pub(crate) fn job_pool(&self) -> &ObjectPool<JobState> {
        &self.inner.jobs
    }

    /// Hand a wrapped fault to the error policy
    pub(crate) fn report(&self, error: LoggerError) -> Result<()> {
        let handler = &self.inner.settings.error_handler;
        let verdict = match catch_unwind(AssertUnwindSafe(|| handler.report_error(&error))) {
            Ok(verdict) => verdict,
            Err(panic_info) => {
                eprintln!(
                    "[LOGGER CRITICAL] {}. Suppressing: {}",
                    LoggerError::panicked("error handler", panic_info),
                    error
                );
                ErrorVerdict::Suppress
            }
        };

        let suppressed = verdict == ErrorVerdict::Suppress;
        self.inner.metrics.record_fault(suppressed);
        if suppressed {
            Ok(())
        } else {
            Err(error)
        }
    }

    fn fail(&self, failure: Failure) -> Result<()> {
        if !failure.reported {
            return self.report(failure.error);
        }
        // The upstream policy already chose to rethrow; a policy of our own
        // still gets the final say
        match &self.inner.upstream_handler {
            Some(upstream) if !Arc::ptr_eq(upstream, &self.inner.settings.error_handler) => {
                self.report(failure.error)
            }
            _ => Err(failure.error),
        }
    }

    /// Steps 1 and the closed check; `Some` ends the call early
    fn gate(&self) -> Option<Result<()>> {
        if !self.is_enabled() {
            return Some(Ok(()));
        }
        if self.is_closed() {
            return Some(self.report(LoggerError::pipeline(
                PipelineStage::Dispatch,
                LoggerError::LoggerStopped,
            )));
        }
        None
    }

    fn process(&self, payload: Payload<'_>) -> Result<()> {
        if let Some(early) = self.gate() {
            return early;
        }

        let record = match self.prepare(payload) {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(()),
            Err(error) => return self.report(error),
        };

        match self.dispatch(|writer| writer.write(&record)) {
            Ok(()) => {
                self.inner.metrics.record_written();
                Ok(())
            }
            Err(failure) => self.fail(failure),
        }
        // `record` goes back to the pool here
    }

    /// Steps 2 to 6; `None` when a filter rejected the event
    fn prepare(&self, payload: Payload<'_>) -> Result<Option<PooledHandle<EventRecord>>> {
        let settings = &self.inner.settings;

        if let Some(filter) = &settings.pre_filter {
            let header = payload.header(&settings.default_source);
            let keep = guarded(PipelineStage::PreFilter, "pre-allocation filter", || {
                filter.should_log(&header)
            })?;
            if !keep {
                self.inner.metrics.record_pre_filtered();
                return Ok(None);
            }
        }

        let mut record = self
            .inner
            .records
            .acquire()
            .map_err(|e| LoggerError::pipeline(PipelineStage::Acquire, e))?;

        self.populate(&mut record, payload)?;

        for provider in &settings.context_providers {
            if let Some(filter) = provider.filter() {
                let keep = guarded(PipelineStage::Enrich, "context provider filter", || {
                    filter.should_process(&record)
                })?;
                if !keep {
                    continue;
                }
            }
            guarded(PipelineStage::Enrich, "context provider", || {
                provider.add_properties(&mut record, &settings.renderers)
            })?;
        }

        if let Some(filter) = &settings.post_filter {
            let keep = guarded(PipelineStage::PostFilter, "post-enrichment filter", || {
                filter.should_process(&record)
            })?;
            if !keep {
                self.inner.metrics.record_post_filtered();
                return Ok(None);
            }
        }

        Ok(Some(record))
    }

    fn populate(&self, record: &mut EventRecord, payload: Payload<'_>) -> Result<()> {
        let settings = &self.inner.settings;
        let renderers = &settings.renderers;

        match payload {
            Payload::Draft(draft) => {
                record.set_name(draft.name);
                record.severity = draft.severity;
                record.set_category(draft.category);
                record.set_source(draft.source.unwrap_or(&settings.default_source));
                record.set_source_method(draft.source_method);
                record.source_line = draft.source_line;
                record.timestamp = draft.timestamp;
                record.fault = draft.fault;
                for (key, value) in draft.properties {
                    let rendered = guarded(PipelineStage::Render, "property renderer", || {
                        renderers.render(value)
                    })?;
                    record.properties.insert(key, rendered);
                }
            }
            Payload::Record(source) => {
                record.copy_from(source);
                if record.source.is_empty() {
                    record.set_source(&settings.default_source);
                }
                if !renderers.is_empty() {
                    for value in record.properties.values_mut() {
                        let raw = std::mem::replace(value, PropertyValue::Null);
                        *value = guarded(PipelineStage::Render, "property renderer", || {
                            renderers.render(raw)
                        })?;
                    }
                }
            }
        }

        if record.timestamp.is_none() {
            let clock = &settings.clock;
            record.timestamp = Some(guarded(PipelineStage::Render, "clock", || Ok(clock.now()))?);
        }
        Ok(())
    }

    /// Step 7 with panic isolation
    fn dispatch<F>(&self, call: F) -> std::result::Result<(), Failure>
    where
        F: FnOnce(&WriterHandle) -> Result<()>,
    {
        let writer = &self.inner.writer;
        match catch_unwind(AssertUnwindSafe(|| call(writer))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) if writer.is_forwarding() && error.is_pipeline_fault() => Err(Failure {
                error,
                reported: true,
            }),
            Ok(Err(error)) => Err(LoggerError::pipeline(PipelineStage::Dispatch, error).into()),
            Err(panic_info) => Err(LoggerError::writer(
                writer.name(),
                LoggerError::panicked("writer", panic_info),
            )
            .into()),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("enabled", &self.is_enabled())
            .field("closed", &self.is_closed())
            .field("writer", &self.inner.writer)
            .field("default_source", &self.inner.settings.default_source)
            .finish()
    }
}

/// Fluent builder for one event
///
/// Nothing is written until [`write`](Self::write) is called.
#[must_use = "an event is only written by calling `write`"]
pub struct EventBuilder<'a> {
    logger: &'a Logger,
    draft: EventDraft<'a>,
}

impl<'a> EventBuilder<'a> {
    pub fn category(mut self, category: &'a str) -> Self {
        self.draft.category = category;
        self
    }

    /// Override the logger's default source
    pub fn source(mut self, source: &'a str) -> Self {
        self.draft.source = Some(source);
        self
    }

    pub fn location(mut self, method: &'a str, line: u32) -> Self {
        self.draft.source_method = Some(method);
        self.draft.source_line = Some(line);
        self
    }

    /// Use a pre-captured timestamp instead of the logger's clock
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.draft.timestamp = Some(timestamp);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.draft.properties.push((key.into(), value.into()));
        self
    }

    pub fn properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        self.draft
            .properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn fault(self, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.shared_fault(Arc::new(error))
    }

    pub fn shared_fault(mut self, fault: Fault) -> Self {
        self.draft.fault = Some(fault);
        self
    }

    pub fn write(self) -> Result<()> {
        self.logger.process(Payload::Draft(self.draft))
    }
}

/// Builder for [`Logger`]
///
/// # Example
///
/// ```
/// use rust_event_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .writer(WriterHandle::exclusive(ConsoleWriter::with_colors(false)))
///     .pre_filter(SeverityFilter::new(Severity::Information))
///     .error_policy(ErrorPolicy::suppress())
///     .build()
///     .unwrap();
/// # drop(logger);
/// ```
#[derive(Debug, Default)]
pub struct LoggerBuilder {
    settings: LoggerSettings,
    batch: Option<BatchConfig>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing settings aggregate
    pub fn from_settings(settings: LoggerSettings) -> Self {
        Self {
            settings,
            batch: None,
        }
    }

    /// Apply a data-only configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: &PipelineConfig) -> Self {
        self.settings.apply(config);
        self.batch = config.batch;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn writer(mut self, writer: WriterHandle) -> Self {
        self.settings.writer = Some(writer);
        self
    }

    /// Deliver through an [`AsyncBatchWriter`] wrapped around the writer
    #[must_use = "builder methods return a new value"]
    pub fn batched(mut self, batch: BatchConfig) -> Self {
        self.batch = Some(batch);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.settings.clock = Arc::new(clock);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn record_pool(mut self, pool: PoolConfig) -> Self {
        self.settings.record_pool = pool;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn job_pool(mut self, pool: PoolConfig) -> Self {
        self.settings.job_pool = pool;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn pre_filter(mut self, filter: impl PreFilter + 'static) -> Self {
        self.settings.pre_filter = Some(Arc::new(filter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn post_filter(mut self, filter: impl EventFilter + 'static) -> Self {
        self.settings.post_filter = Some(Arc::new(filter));
        self
    }

    /// Append a context provider; providers run in the order they are added
    #[must_use = "builder methods return a new value"]
    pub fn context_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.settings.context_providers.push(Arc::new(provider));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn renderers(mut self, renderers: RendererMap) -> Self {
        self.settings.renderers = renderers;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_policy(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.settings.error_handler = Arc::new(handler);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn default_source(mut self, source: impl Into<String>) -> Self {
        self.settings.default_source = source.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.settings.enabled = enabled;
        self
    }

    pub fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    pub fn build(self) -> Result<Logger> {
        let mut settings = self.settings;
        if let Some(batch) = self.batch {
            batch.validate()?;
            let inner = settings
                .writer
                .take()
                .ok_or_else(|| LoggerError::config("logger", "a destination writer is required"))?;
            let batched = AsyncBatchWriter::builder(inner)
                .batch_size(batch.batch_size)
                .flush_timeout(batch.flush_timeout())
                .shutdown_timeout(batch.shutdown_timeout())
                .shared_error_handler(Arc::clone(&settings.error_handler))
                .build()?;
            settings.writer = Some(WriterHandle::concurrent(batched));
        }
        Logger::new(&settings)
    }
}

/// Builder for a logger that forwards to a parent
///
/// The child runs its own filters and context providers first, then hands the
/// record to the parent's pipeline. Clock, renderers, pool sizes, default
/// source and error policy are inherited unless overridden.
///
/// # Example
///
/// ```
/// use rust_event_logger::prelude::*;
///
/// let memory = MemoryWriter::new();
/// let parent = Logger::builder()
///     .writer(WriterHandle::concurrent(memory.clone()))
///     .build()
///     .unwrap();
///
/// let worker = parent.child().property("worker", 7).build().unwrap();
/// worker.information("picked up task").unwrap();
///
/// assert_eq!(memory.records()[0].property("worker"), Some(&PropertyValue::from(7)));
/// ```
pub struct ChildLoggerBuilder {
    parent: Logger,
    properties: StaticPropertiesProvider,
    pre_filter: Option<Arc<dyn PreFilter>>,
    post_filter: Option<Arc<dyn EventFilter>>,
    providers: Vec<Arc<dyn ContextProvider>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    default_source: Option<String>,
}

impl ChildLoggerBuilder {
    fn new(parent: Logger) -> Self {
        Self {
            parent,
            properties: StaticPropertiesProvider::new(),
            pre_filter: None,
            post_filter: None,
            providers: Vec::new(),
            error_handler: None,
            default_source: None,
        }
    }

    /// Fixed property added to everything the child writes
    #[must_use = "builder methods return a new value"]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties = self.properties.with_property(key, value);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn pre_filter(mut self, filter: impl PreFilter + 'static) -> Self {
        self.pre_filter = Some(Arc::new(filter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn post_filter(mut self, filter: impl EventFilter + 'static) -> Self {
        self.post_filter = Some(Arc::new(filter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn context_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_policy(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = Some(source.into());
        self
    }

    pub fn build(self) -> Result<Logger> {
        let parent = self.parent.settings();

        let mut providers: Vec<Arc<dyn ContextProvider>> = Vec::with_capacity(self.providers.len() + 1);
        if !self.properties.properties().is_empty() {
            providers.push(Arc::new(self.properties));
        }
        providers.extend(self.providers);

        let settings = LoggerSettings {
            enabled: true,
            writer: Some(ForwardingWriter::handle(self.parent.clone())),
            clock: Arc::clone(&parent.clock),
            record_pool: parent.record_pool,
            job_pool: parent.job_pool,
            pre_filter: self.pre_filter,
            post_filter: self.post_filter,
            context_providers: providers,
            renderers: parent.renderers.clone(),
            error_handler: self
                .error_handler
                .unwrap_or_else(|| Arc::clone(&parent.error_handler)),
            default_source: self
                .default_source
                .unwrap_or_else(|| parent.default_source.clone()),
        };
        Logger::assemble(&settings, Some(Arc::clone(&parent.error_handler)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::error_policy::ErrorPolicy;
    use crate::core::filter::SeverityFilter;
    use crate::core::writer::{ConcurrentWriter, EventWriter};
    use crate::writers::MemoryWriter;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;

    fn memory_logger() -> (Logger, MemoryWriter) {
        let memory = MemoryWriter::new();
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(memory.clone()))
            .build()
            .unwrap();
        (logger, memory)
    }

    struct PanickingWriter;

    impl EventWriter for PanickingWriter {
        fn write(&mut self, _record: &EventRecord) -> Result<()> {
            panic!("writer bug");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    struct RejectingWriter;

    impl ConcurrentWriter for RejectingWriter {
        fn write(&self, _record: &EventRecord) -> Result<()> {
            Err(LoggerError::other("destination unavailable"))
        }

        fn name(&self) -> &str {
            "rejecting"
        }
    }

    #[test]
    fn test_build_requires_writer() {
        let err = Logger::builder().build().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_build_rejects_zero_pool_capacity() {
        let err = Logger::builder()
            .writer(WriterHandle::concurrent(MemoryWriter::new()))
            .record_pool(PoolConfig::new(0, Default::default()))
            .build()
            .unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_event_fields_are_populated() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let memory = MemoryWriter::new();
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(memory.clone()))
            .clock(FixedClock(instant))
            .default_source("api")
            .build()
            .unwrap();

        logger
            .event(Severity::Error, "lookup failed")
            .category("db")
            .location("users::find", 42)
            .property("table", "users")
            .fault(std::io::Error::other("timeout"))
            .write()
            .unwrap();

        let record = &memory.records()[0];
        assert_eq!(record.name, "lookup failed");
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.category, "db");
        assert_eq!(record.source, "api");
        assert_eq!(record.source_method.as_deref(), Some("users::find"));
        assert_eq!(record.source_line, Some(42));
        assert_eq!(record.timestamp, Some(instant));
        assert_eq!(record.property("table"), Some(&PropertyValue::from("users")));
        assert_eq!(record.fault.as_ref().map(|f| f.to_string()), Some("timeout".to_string()));
    }

    #[test]
    fn test_supplied_timestamp_is_kept() {
        let (logger, memory) = memory_logger();
        let captured = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        logger
            .event(Severity::Information, "replayed")
            .timestamp(captured)
            .write()
            .unwrap();
        assert_eq!(memory.records()[0].timestamp, Some(captured));
    }

    #[test]
    fn test_write_event_does_not_touch_caller_record() {
        let (logger, memory) = memory_logger();
        let original = EventRecord::new(Severity::Warning, "structured").with_property("k", 1);

        logger.write_event(&original).unwrap();

        assert!(original.timestamp.is_none());
        assert_eq!(original.properties.len(), 1);
        let written = &memory.records()[0];
        assert_eq!(written.name, "structured");
        assert!(written.timestamp.is_some());
    }

    #[test]
    fn test_records_are_reused() {
        let (logger, memory) = memory_logger();
        for i in 0..50 {
            logger.event(Severity::Debug, "tick").property("i", i).write().unwrap();
        }
        assert_eq!(memory.len(), 50);
        assert_eq!(logger.record_pool_metrics().created(), 1);
        assert_eq!(logger.record_pool_metrics().taken(), 50);
        // A reused record never leaks properties of an earlier event
        assert!(memory.records().iter().all(|r| r.properties.len() == 1));
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let (logger, memory) = memory_logger();
        logger.set_enabled(false);
        logger.critical("ignored").unwrap();
        assert!(memory.is_empty());
        assert_eq!(logger.record_pool_metrics().taken(), 0);

        logger.set_enabled(true);
        logger.critical("kept").unwrap();
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_pre_filter_skips_pool() {
        let memory = MemoryWriter::new();
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(memory.clone()))
            .pre_filter(SeverityFilter::new(Severity::Warning))
            .build()
            .unwrap();

        logger.debug("dropped").unwrap();
        assert_eq!(logger.record_pool_metrics().taken(), 0);
        assert_eq!(logger.metrics().pre_filtered(), 1);

        logger.warning("kept").unwrap();
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_writer_fault_is_suppressed_by_default() {
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(RejectingWriter))
            .error_policy(ErrorPolicy::suppress().with_observer(|_err: &LoggerError| {}))
            .build()
            .unwrap();

        assert!(logger.information("x").is_ok());
        assert_eq!(logger.metrics().faults_reported(), 1);
        assert_eq!(logger.metrics().faults_suppressed(), 1);
        assert_eq!(logger.metrics().events_written(), 0);
    }

    #[test]
    fn test_writer_fault_rethrown_keeps_writer_name() {
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(RejectingWriter))
            .error_policy(ErrorPolicy::rethrow())
            .build()
            .unwrap();

        let err = logger.information("x").unwrap_err();
        assert_eq!(err.writer_name(), Some("rejecting"));
    }

    #[test]
    fn test_writer_panic_is_contained() {
        let logger = Logger::builder()
            .writer(WriterHandle::exclusive(PanickingWriter))
            .error_policy(ErrorPolicy::rethrow())
            .build()
            .unwrap();

        let err = logger.information("x").unwrap_err();
        assert_eq!(err.writer_name(), Some("panicking"));
        // The writer mutex is still usable afterwards
        assert!(logger.information("y").is_err());
    }

    #[test]
    fn test_close_stops_logger() {
        let (logger, memory) = memory_logger();
        logger.close().unwrap();
        assert!(memory.is_closed());
        assert!(logger.is_closed());
        assert!(logger.information("late").is_ok());
        assert!(memory.is_empty());
        logger.close().unwrap();
    }

    #[test]
    fn test_write_batch_single_dispatch() {
        let (logger, memory) = memory_logger();
        let records: Vec<_> = (0..5)
            .map(|i| EventRecord::new(Severity::Information, &format!("batch-{}", i)))
            .collect();

        logger.write_batch(&records).unwrap();
        assert_eq!(memory.len(), 5);
        assert_eq!(memory.batch_count(), 1);
        assert_eq!(logger.metrics().events_written(), 5);
        assert!(logger.record_pool_metrics().recycled() >= 1);
    }

    #[test]
    fn test_child_forwards_with_properties() {
        let (parent, memory) = memory_logger();
        let child = parent
            .child()
            .property("component", "scheduler")
            .default_source("child-source")
            .build()
            .unwrap();

        child.warning("slow tick").unwrap();

        let record = &memory.records()[0];
        assert_eq!(record.source, "child-source");
        assert_eq!(record.property("component"), Some(&PropertyValue::from("scheduler")));
        assert_eq!(parent.metrics().events_written(), 1);
        assert_eq!(child.metrics().events_written(), 1);
    }

    #[test]
    fn test_child_fault_reported_once() {
        let reports = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reports);
        let parent = Logger::builder()
            .writer(WriterHandle::concurrent(RejectingWriter))
            .error_policy(ErrorPolicy::rethrow().with_observer(move |_err: &LoggerError| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();
        let child = parent.child().build().unwrap();

        let err = child.information("x").unwrap_err();
        assert_eq!(err.writer_name(), Some("rejecting"));
        assert_eq!(reports.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_child_policy_decides_forwarded_fault() {
        let parent = Logger::builder()
            .writer(WriterHandle::concurrent(RejectingWriter))
            .error_policy(ErrorPolicy::rethrow())
            .build()
            .unwrap();

        let quiet = parent.child().error_policy(ErrorPolicy::suppress()).build().unwrap();
        assert!(quiet.information("x").is_ok());
        assert_eq!(quiet.metrics().faults_suppressed(), 1);

        let reports = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reports);
        let strict = parent
            .child()
            .error_policy(ErrorPolicy::rethrow().with_observer(move |_err: &LoggerError| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();
        let err = strict.information("y").unwrap_err();
        assert_eq!(err.writer_name(), Some("rejecting"));
        assert_eq!(reports.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batched_logger_shares_error_policy() {
        let reports = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reports);
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(RejectingWriter))
            .batched(BatchConfig::new(100, std::time::Duration::ZERO))
            .error_policy(ErrorPolicy::suppress().with_observer(move |err: &LoggerError| {
                assert_eq!(err.writer_name(), Some("rejecting"));
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        logger.information("queued").unwrap();
        logger.flush().unwrap();
        assert_eq!(reports.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batched_builder_wraps_writer() {
        let memory = MemoryWriter::new();
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(memory.clone()))
            .batched(BatchConfig::new(100, std::time::Duration::ZERO))
            .build()
            .unwrap();

        assert!(!logger.writer().requires_synchronization());
        for _ in 0..3 {
            logger.information("queued").unwrap();
        }
        assert!(memory.is_empty());

        logger.flush().unwrap();
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn test_settings_are_copied_at_construction() {
        let memory = MemoryWriter::new();
        let mut settings = LoggerSettings {
            writer: Some(WriterHandle::concurrent(memory.clone())),
            default_source: "first".to_string(),
            ..Default::default()
        };
        let logger = Logger::new(&settings).unwrap();
        settings.default_source = "second".to_string();

        logger.information("x").unwrap();
        assert_eq!(logger.default_source(), "first");
        assert_eq!(memory.records()[0].source, "first");
    }
}
