//! # Rust Event Logger
//!
//! A structured event-logging pipeline: pooled event records, two-stage
//! filtering, pluggable context enrichment and renderers, correlated job
//! events, and batched asynchronous delivery to destination writers.
//!
//! ## Features
//!
//! - **Low allocation**: event records and job tokens are reused through bounded object pools
//! - **Two-stage filtering**: reject before a record is allocated, or after enrichment
//! - **Fault isolation**: collaborator faults and panics go through one suppress-or-rethrow policy
//! - **Batching**: a background worker drains queued records on a size threshold or quiet period
//!
//! ## Example
//!
//! ```
//! use rust_event_logger::prelude::*;
//!
//! let memory = MemoryWriter::new();
//! let logger = Logger::builder()
//!     .writer(WriterHandle::concurrent(memory.clone()))
//!     .pre_filter(SeverityFilter::new(Severity::Information))
//!     .build()
//!     .unwrap();
//!
//! logger.debug("filtered out").unwrap();
//! logger.event(Severity::Information, "order placed").property("items", 3).write().unwrap();
//!
//! assert_eq!(memory.len(), 1);
//! ```

pub mod core;
pub mod macros;
pub mod writers;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::writers::{ConsoleFormat, ConsoleWriter};
    pub use crate::core::{
        BatchConfig, ChildLoggerBuilder, Clock, ConcurrentWriter, ContextGuard,
        ContextPropertiesProvider, ContextProvider, ErrorHandler, ErrorPolicy, ErrorVerdict,
        EventBuilder, EventFilter, EventHeader, EventRecord, EventWriter, Fault, FaultRenderer,
        FixedClock, JobToken, Logger, LoggerBuilder, LoggerContext, LoggerError, LoggerMetrics,
        LoggerSettings, ObjectPool, PipelineConfig, PoolConfig, PooledHandle, PreFilter,
        PropertyRenderer, PropertyValue, Recyclable, ReinitTiming, RendererMap, Result,
        SamplingConfig, SamplingFilter, Severity, SeverityFilter, StaticPropertiesProvider,
        SystemClock, WriterHandle,
    };
    pub use crate::writers::{AsyncBatchWriter, ForwardingWriter, MemoryWriter};
}

#[cfg(feature = "console")]
pub use writers::{ConsoleFormat, ConsoleWriter};
pub use core::{
    ContextGuard, ErrorPolicy, EventRecord, JobToken, Logger, LoggerBuilder, LoggerContext,
    LoggerError, LoggerMetrics, ObjectPool, PipelineConfig, PoolMetrics, PooledHandle,
    PropertyValue, Result, Severity, WriterHandle, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use writers::{AsyncBatchWriter, MemoryWriter};
