//! Logger configuration
//!
//! [`PipelineConfig`] carries the data-only knobs and can be loaded from JSON.
//! [`LoggerSettings`] is the full aggregate a [`Logger`](super::logger::Logger)
//! is built from, including the collaborator objects; the logger clones it once
//! at construction, so later changes to a settings value have no effect on
//! loggers already built from it.
//!
//! # Example
//!
//! ```
//! use rust_event_logger::core::config::PipelineConfig;
//! use rust_event_logger::core::pool::ReinitTiming;
//! use rust_event_logger::core::severity::Severity;
//!
//! let config = PipelineConfig::from_json(r#"{
//!     "default_source": "billing",
//!     "min_severity": "Debug",
//!     "record_pool": { "capacity": 256, "timing": "OnTake" },
//!     "batch": { "batch_size": 100, "flush_timeout_ms": 250 }
//! }"#).unwrap();
//!
//! assert!(config.enabled);
//! assert_eq!(config.min_severity, Some(Severity::Debug));
//! assert_eq!(config.record_pool.capacity, 256);
//! assert_eq!(config.job_pool.timing, ReinitTiming::OnTake);
//! assert_eq!(config.batch.unwrap().batch_size, 100);
//! ```

use super::clock::{Clock, SystemClock};
use super::error::{LoggerError, Result};
use super::error_policy::{ErrorHandler, ErrorPolicy};
use super::filter::{EventFilter, PreFilter, SeverityFilter};
use super::pool::{ReinitTiming, DEFAULT_POOL_SIZE};
use super::provider::ContextProvider;
use super::renderer::RendererMap;
use super::severity::Severity;
use super::writer::WriterHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of records that triggers an immediate batch drain
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default quiet period after which a partial batch is drained
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(100);

/// Default time `close` waits for the batch worker's final drain
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity and reinitialization timing of one object pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub capacity: usize,
    pub timing: ReinitTiming,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_SIZE,
            timing: ReinitTiming::OnTake,
        }
    }
}

impl PoolConfig {
    pub fn new(capacity: usize, timing: ReinitTiming) -> Self {
        Self { capacity, timing }
    }

    pub fn validate(&self, component: &str) -> Result<()> {
        if self.capacity == 0 {
            return Err(LoggerError::config(component, "pool capacity must be greater than zero"));
        }
        Ok(())
    }
}

/// Settings of an [`AsyncBatchWriter`](crate::writers::AsyncBatchWriter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Queue length that wakes the worker immediately
    pub batch_size: usize,
    /// Quiet period in milliseconds; 0 disables the timer
    pub flush_timeout_ms: u64,
    /// How long `close` waits for the final drain
    pub shutdown_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_timeout_ms: DEFAULT_FLUSH_TIMEOUT.as_millis() as u64,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64,
        }
    }
}

impl BatchConfig {
    pub fn new(batch_size: usize, flush_timeout: Duration) -> Self {
        Self {
            batch_size,
            flush_timeout_ms: flush_timeout.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LoggerError::config("batch_writer", "batch size must be greater than zero"));
        }
        Ok(())
    }
}

/// Data-only logger configuration, loadable from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub enabled: bool,
    pub default_source: String,
    /// Installs a [`SeverityFilter`] as the pre-allocation filter
    pub min_severity: Option<Severity>,
    pub record_pool: PoolConfig,
    pub job_pool: PoolConfig,
    /// Wrap the configured writer in an asynchronous batch writer
    pub batch: Option<BatchConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_source: String::new(),
            min_severity: None,
            record_pool: PoolConfig::default(),
            job_pool: PoolConfig::default(),
            batch: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.record_pool.validate("record_pool")?;
        self.job_pool.validate("job_pool")?;
        if let Some(batch) = &self.batch {
            batch.validate()?;
        }
        Ok(())
    }
}

/// Everything a logger is built from
///
/// Usually assembled through [`LoggerBuilder`](super::logger::LoggerBuilder).
#[derive(Clone)]
pub struct LoggerSettings {
    pub enabled: bool,
    pub writer: Option<WriterHandle>,
    pub clock: Arc<dyn Clock>,
    pub record_pool: PoolConfig,
    pub job_pool: PoolConfig,
    pub pre_filter: Option<Arc<dyn PreFilter>>,
    pub post_filter: Option<Arc<dyn EventFilter>>,
    pub context_providers: Vec<Arc<dyn ContextProvider>>,
    pub renderers: RendererMap,
    pub error_handler: Arc<dyn ErrorHandler>,
    pub default_source: String,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            writer: None,
            clock: Arc::new(SystemClock),
            record_pool: PoolConfig::default(),
            job_pool: PoolConfig::default(),
            pre_filter: None,
            post_filter: None,
            context_providers: Vec::new(),
            renderers: RendererMap::new(),
            error_handler: Arc::new(ErrorPolicy::suppress()),
            default_source: String::new(),
        }
    }
}

impl LoggerSettings {
    /// Apply the data-only knobs of `config`
    ///
    /// The batch section is handled by the builder, which needs the writer.
    pub fn apply(&mut self, config: &PipelineConfig) {
        self.enabled = config.enabled;
        self.default_source.clone_from(&config.default_source);
        self.record_pool = config.record_pool;
        self.job_pool = config.job_pool;
        if let Some(min) = config.min_severity {
            self.pre_filter = Some(Arc::new(SeverityFilter::new(min)));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.writer.is_none() {
            return Err(LoggerError::config("logger", "a destination writer is required"));
        }
        self.record_pool.validate("record_pool")?;
        self.job_pool.validate("job_pool")?;
        Ok(())
    }
}

impl fmt::Debug for LoggerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerSettings")
            .field("enabled", &self.enabled)
            .field("writer", &self.writer)
            .field("record_pool", &self.record_pool)
            .field("job_pool", &self.job_pool)
            .field("pre_filter", &self.pre_filter.is_some())
            .field("post_filter", &self.post_filter.is_some())
            .field("context_providers", &self.context_providers.len())
            .field("renderers", &self.renderers)
            .field("default_source", &self.default_source)
            .finish()
    }
}
