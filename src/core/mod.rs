//! Core pipeline types and traits

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod error_policy;
pub mod event_record;
pub mod filter;
pub mod job;
pub mod logger;
pub mod metrics;
pub mod pool;
pub mod property;
pub mod provider;
pub mod renderer;
pub mod sampling;
pub mod severity;
pub mod writer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    BatchConfig, LoggerSettings, PipelineConfig, PoolConfig, DEFAULT_BATCH_SIZE,
    DEFAULT_FLUSH_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use context::{ContextGuard, LoggerContext};
pub use error::{Fault, LoggerError, PipelineStage, Result};
pub use error_policy::{ErrorHandler, ErrorObserver, ErrorPolicy, ErrorVerdict};
pub use event_record::EventRecord;
pub use filter::{EventFilter, EventHeader, PreFilter, SeverityFilter};
pub use job::{JobBuilder, JobState, JobToken};
pub use logger::{ChildLoggerBuilder, EventBuilder, Logger, LoggerBuilder};
pub use metrics::{LoggerMetrics, PoolMetrics};
pub use pool::{ObjectPool, ObjectPoolBuilder, PooledHandle, Recyclable, ReinitTiming, DEFAULT_POOL_SIZE};
pub use property::{ObjectValue, Properties, PropertyValue};
pub use provider::{ContextPropertiesProvider, ContextProvider, StaticPropertiesProvider};
pub use renderer::{FaultRenderer, PropertyRenderer, RendererMap};
pub use sampling::{SamplerMetrics, SamplingConfig, SamplingFilter};
pub use severity::Severity;
pub use writer::{ConcurrentWriter, EventWriter, WriterHandle};
