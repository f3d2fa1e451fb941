//! Sampling pre-allocation filter for high-volume call sites
//!
//! Drops a configurable share of events before any record is acquired, while
//! guaranteeing that selected severities (by default Error and Critical) are
//! always kept.
//!
//! # Example
//!
//! ```
//! use rust_event_logger::prelude::*;
//!
//! let sampler = SamplingFilter::new(
//!     SamplingConfig::new(0.1).with_category_rate("heartbeat", 0.01),
//! );
//!
//! let logger = Logger::builder()
//!     .writer(WriterHandle::concurrent(MemoryWriter::new()))
//!     .pre_filter(sampler)
//!     .build()
//!     .unwrap();
//! # drop(logger);
//! ```

use super::error::Result;
use super::filter::{EventHeader, PreFilter};
use super::severity::Severity;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Configuration for event sampling
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Sample rate between 0.0 and 1.0
    ///
    /// - 1.0 = no sampling (keep everything)
    /// - 0.1 = keep 10% of events
    /// - 0.0 = drop all events (except `always_sample` severities)
    pub rate: f64,

    /// Severities that are never sampled out
    pub always_sample: Vec<Severity>,

    /// Per-category sample rates, overriding `rate`
    pub category_rates: HashMap<String, f64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            always_sample: vec![Severity::Error, Severity::Critical],
            category_rates: HashMap::new(),
        }
    }
}

impl SamplingConfig {
    /// Create a sampling config with the given rate, clamped to 0.0..=1.0
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_always_sample(mut self, severities: Vec<Severity>) -> Self {
        self.always_sample = severities;
        self
    }

    #[must_use]
    pub fn with_category_rate(mut self, category: impl Into<String>, rate: f64) -> Self {
        self.category_rates.insert(category.into(), rate.clamp(0.0, 1.0));
        self
    }

    fn rate_for(&self, category: &str) -> f64 {
        self.category_rates.get(category).copied().unwrap_or(self.rate)
    }
}

/// Counters for sampling decisions
#[derive(Debug)]
pub struct SamplerMetrics {
    sampled_count: AtomicU64,
    dropped_count: AtomicU64,
}

impl SamplerMetrics {
    pub const fn new() -> Self {
        Self {
            sampled_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn sampled_count(&self) -> u64 {
        self.sampled_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_count(&self) -> u64 {
        self.sampled_count() + self.dropped_count()
    }

    /// Observed share of events kept; 1.0 before any decision
    pub fn effective_sample_rate(&self) -> f64 {
        let total = self.total_count() as f64;
        if total == 0.0 {
            1.0
        } else {
            self.sampled_count() as f64 / total
        }
    }

    fn record(&self, sampled: bool) -> bool {
        if sampled {
            self.sampled_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dropped_count.fetch_add(1, Ordering::Relaxed);
        }
        sampled
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-allocation filter that keeps a random share of events
#[derive(Debug, Clone)]
pub struct SamplingFilter {
    config: SamplingConfig,
    metrics: Arc<SamplerMetrics>,
}

impl SamplingFilter {
    pub fn new(config: SamplingConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(SamplerMetrics::new()),
        }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Metrics shared by every clone of this filter
    pub fn metrics(&self) -> Arc<SamplerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Decide whether an event of this severity and category is kept
    pub fn should_sample(&self, severity: Severity, category: &str) -> bool {
        if self.config.always_sample.contains(&severity) {
            return self.metrics.record(true);
        }

        let rate = self.config.rate_for(category);
        if rate >= 1.0 {
            return self.metrics.record(true);
        }
        if rate <= 0.0 {
            return self.metrics.record(false);
        }

        let sampled = rand::thread_rng().gen::<f64>() < rate;
        self.metrics.record(sampled)
    }
}

impl PreFilter for SamplingFilter {
    fn should_log(&self, header: &EventHeader<'_>) -> Result<bool> {
        Ok(self.should_sample(header.severity, header.category))
    }
}
