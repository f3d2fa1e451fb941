//! Job tokens: correlated start and terminal events around a unit of work
//!
//! A [`JobToken`] writes a `Start` event when it is created and exactly one
//! terminal event when it is completed or dropped. Every event of one job
//! carries the same `job_id`, so a sink can pair them up.
//!
//! | Outcome                          | Category    | Severity    |
//! |----------------------------------|-------------|-------------|
//! | a fault was recorded             | `Failure`   | Error       |
//! | cancelled                        | `Cancelled` | Warning     |
//! | ran past its expected duration   | `Overrun`   | Warning     |
//! | otherwise                        | `Completed` | Information |
//!
//! # Example
//!
//! ```
//! use rust_event_logger::prelude::*;
//!
//! let memory = MemoryWriter::new();
//! let logger = Logger::builder()
//!     .writer(WriterHandle::concurrent(memory.clone()))
//!     .build()
//!     .unwrap();
//!
//! let job = logger.job("nightly import").property("files", 3).begin().unwrap();
//! job.complete().unwrap();
//!
//! let records = memory.records();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[0].category, "Start");
//! assert_eq!(records[1].category, "Completed");
//! assert_eq!(records[0].property("job_id"), records[1].property("job_id"));
//! ```

use super::error::{Fault, LoggerError, PipelineStage, Result};
use super::logger::Logger;
use super::pool::{PooledHandle, Recyclable};
use super::property::{Properties, PropertyValue};
use super::severity::Severity;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const CATEGORY_START: &str = "Start";
pub const CATEGORY_FAILURE: &str = "Failure";
pub const CATEGORY_CANCELLED: &str = "Cancelled";
pub const CATEGORY_OVERRUN: &str = "Overrun";
pub const CATEGORY_COMPLETED: &str = "Completed";

/// Pooled state behind a [`JobToken`]
#[derive(Debug)]
pub struct JobState {
    name: String,
    id: String,
    parent_id: Option<String>,
    started: Instant,
    expected: Option<Duration>,
    fault: Option<Fault>,
    cancelled: bool,
    properties: Properties,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            name: String::new(),
            id: String::new(),
            parent_id: None,
            started: Instant::now(),
            expected: None,
            fault: None,
            cancelled: false,
            properties: Properties::new(),
        }
    }
}

impl JobState {
    /// Clear everything but the allocations
    pub fn reset(&mut self) {
        self.name.clear();
        self.id.clear();
        self.parent_id = None;
        self.expected = None;
        self.fault = None;
        self.cancelled = false;
        self.properties.clear();
    }

    fn outcome(&self, elapsed: Duration) -> (Severity, &'static str) {
        if self.fault.is_some() {
            (Severity::Error, CATEGORY_FAILURE)
        } else if self.cancelled {
            (Severity::Warning, CATEGORY_CANCELLED)
        } else if self.expected.is_some_and(|budget| elapsed > budget) {
            (Severity::Warning, CATEGORY_OVERRUN)
        } else {
            (Severity::Information, CATEGORY_COMPLETED)
        }
    }
}

impl Recyclable for JobState {}

/// Builder returned by [`Logger::job`]
#[must_use = "a job is only started by calling `begin`"]
pub struct JobBuilder<'a> {
    logger: &'a Logger,
    name: &'a str,
    parent_id: Option<String>,
    expected: Option<Duration>,
    properties: Properties,
}

impl<'a> JobBuilder<'a> {
    pub(crate) fn new(logger: &'a Logger, name: &'a str) -> Self {
        Self {
            logger,
            name,
            parent_id: None,
            expected: None,
            properties: Properties::new(),
        }
    }

    /// Extra property written on every event of the job
    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Budget after which a fault-free, uncancelled job ends as `Overrun`
    pub fn expected_duration(mut self, budget: Duration) -> Self {
        self.expected = Some(budget);
        self
    }

    fn parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    /// Take a token from the job pool and write the Start event
    ///
    /// A pool fault is handed to the error policy; when suppressed the call
    /// still fails, since there is no token to return.
    pub fn begin(self) -> Result<JobToken> {
        let logger = self.logger;
        let mut state = match logger.job_pool().acquire() {
            Ok(state) => state,
            Err(e) => {
                logger.report(LoggerError::pipeline(PipelineStage::Job, e))?;
                return Err(LoggerError::unavailable("job pool"));
            }
        };

        state.name.push_str(self.name);
        state.id = Uuid::new_v4().to_string();
        state.parent_id = self.parent_id;
        state.expected = self.expected;
        state.properties = self.properties;
        state.started = Instant::now();

        let mut token = JobToken {
            state,
            logger: logger.clone(),
            finished: false,
        };
        if let Err(e) = token.emit(Severity::Information, CATEGORY_START, None, None) {
            // No token reaches the caller, so no terminal event either
            token.finished = true;
            return Err(e);
        }
        Ok(token)
    }
}

/// A running job
///
/// Dropping the token writes its terminal event; use
/// [`complete`](Self::complete) to observe a fault from that write.
pub struct JobToken {
    state: PooledHandle<JobState>,
    logger: Logger,
    finished: bool,
}

impl JobToken {
    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.state.parent_id.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.state.started.elapsed()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled
    }

    /// First fault recorded on this job
    pub fn fault(&self) -> Option<&Fault> {
        self.state.fault.as_ref()
    }

    /// Mark the job as cancelled; ignored when a fault has been recorded
    pub fn cancel(&mut self) {
        self.state.cancelled = true;
    }

    /// Write a Failure event for `error`
    ///
    /// Every call writes its own event; only the first fault is kept for the
    /// terminal event.
    pub fn record_fault(&mut self, error: impl std::error::Error + Send + Sync + 'static) -> Result<()> {
        self.record_shared_fault(Arc::new(error))
    }

    pub fn record_shared_fault(&mut self, fault: Fault) -> Result<()> {
        if self.state.fault.is_none() {
            self.state.fault = Some(Arc::clone(&fault));
        }
        self.emit(Severity::Error, CATEGORY_FAILURE, None, Some(fault))
    }

    /// Start a nested job carrying this job's extra properties and a
    /// `parent_job_id` pointing back here
    pub fn begin_child(&self, name: &str) -> Result<JobToken> {
        let mut builder = self.logger.job(name).parent(&self.state.id);
        builder.properties = self.state.properties.clone();
        builder.begin()
    }

    /// Child logger whose events carry this job's id and name
    pub fn logger(&self) -> Result<Logger> {
        self.logger
            .child()
            .property("job_id", self.state.id.as_str())
            .property("job_name", self.state.name.as_str())
            .build()
    }

    /// Write the terminal event and return the state to the pool
    pub fn complete(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let elapsed = self.elapsed();
        let (severity, category) = self.state.outcome(elapsed);
        let fault = self.state.fault.clone();
        self.emit(severity, category, Some(elapsed), fault)
    }

    fn emit(
        &self,
        severity: Severity,
        category: &str,
        elapsed: Option<Duration>,
        fault: Option<Fault>,
    ) -> Result<()> {
        let state = &*self.state;
        let mut event = self
            .logger
            .event(severity, &state.name)
            .category(category)
            .property("job_name", state.name.as_str())
            .property("job_id", state.id.as_str())
            .properties(state.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(parent_id) = &state.parent_id {
            event = event.property("parent_job_id", parent_id.as_str());
        }
        if let Some(elapsed) = elapsed {
            event = event.property("elapsed", elapsed);
        }
        if let Some(fault) = fault {
            event = event.shared_fault(fault);
        }
        event.write()
    }
}

impl Drop for JobToken {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            eprintln!("[LOGGER ERROR] Failed to write terminal event of job {}: {}", self.state.id, e);
        }
    }
}

impl fmt::Debug for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobToken")
            .field("name", &self.state.name)
            .field("id", &self.state.id)
            .field("parent_id", &self.state.parent_id)
            .field("cancelled", &self.state.cancelled)
            .field("faulted", &self.state.fault.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error_policy::ErrorPolicy;
    use crate::core::event_record::EventRecord;
    use crate::core::writer::WriterHandle;
    use crate::writers::MemoryWriter;

    fn setup() -> (Logger, MemoryWriter) {
        let memory = MemoryWriter::new();
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(memory.clone()))
            .error_policy(ErrorPolicy::rethrow())
            .build()
            .unwrap();
        (logger, memory)
    }

    #[test]
    fn test_start_and_completed_share_id() {
        let (logger, memory) = setup();
        let job = logger.begin_job("sync").unwrap();
        let id = job.id().to_string();
        drop(job);

        let records = memory.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "sync");
        assert_eq!(records[0].category, CATEGORY_START);
        assert_eq!(records[0].severity, Severity::Information);
        assert_eq!(records[1].category, CATEGORY_COMPLETED);
        for record in &records {
            assert_eq!(record.property("job_id"), Some(&PropertyValue::from(id.as_str())));
        }
        assert!(matches!(records[1].property("elapsed"), Some(PropertyValue::Duration(_))));
    }

    #[test]
    fn test_fault_makes_terminal_error() {
        let (logger, memory) = setup();
        let mut job = logger.begin_job("upload").unwrap();
        job.record_fault(std::io::Error::other("first")).unwrap();
        job.record_fault(std::io::Error::other("second")).unwrap();
        job.complete().unwrap();

        let records = memory.records();
        let categories: Vec<_> = records.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["Start", "Failure", "Failure", "Failure"]);

        let terminal = records.last().unwrap();
        assert_eq!(terminal.severity, Severity::Error);
        assert_eq!(terminal.fault.as_ref().unwrap().to_string(), "first");
        assert!(terminal.property("elapsed").is_some());
    }

    #[test]
    fn test_cancelled_job() {
        let (logger, memory) = setup();
        let mut job = logger.begin_job("scan").unwrap();
        job.cancel();
        drop(job);

        let terminal = memory.records().pop().unwrap();
        assert_eq!(terminal.category, CATEGORY_CANCELLED);
        assert_eq!(terminal.severity, Severity::Warning);
    }

    #[test]
    fn test_overrun_job() {
        let (logger, memory) = setup();
        let job = logger
            .job("slow")
            .expected_duration(Duration::from_millis(1))
            .begin()
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        job.complete().unwrap();

        let terminal = memory.records().pop().unwrap();
        assert_eq!(terminal.category, CATEGORY_OVERRUN);
        assert_eq!(terminal.severity, Severity::Warning);
    }

    #[test]
    fn test_child_job_links_parent() {
        let (logger, memory) = setup();
        let parent = logger.job("batch").property("tenant", "acme").begin().unwrap();
        let child = parent.begin_child("item").unwrap();
        assert_eq!(child.parent_id(), Some(parent.id()));
        let parent_id = parent.id().to_string();
        drop(child);
        drop(parent);

        let child_start = memory
            .records()
            .into_iter()
            .find(|r| r.name == "item" && r.category == CATEGORY_START)
            .unwrap();
        assert_eq!(child_start.property("parent_job_id"), Some(&PropertyValue::from(parent_id.as_str())));
        assert_eq!(child_start.property("tenant"), Some(&PropertyValue::from("acme")));
    }

    #[test]
    fn test_job_logger_tags_events() {
        let (logger, memory) = setup();
        let job = logger.begin_job("render").unwrap();
        let job_logger = job.logger().unwrap();
        job_logger.information("page done").unwrap();

        let record = memory
            .records()
            .into_iter()
            .find(|r| r.name == "page done")
            .unwrap();
        assert_eq!(record.property("job_id"), Some(&PropertyValue::from(job.id())));
        assert_eq!(record.property("job_name"), Some(&PropertyValue::from("render")));
    }

    #[test]
    fn test_failed_start_writes_no_terminal_event() {
        let memory = MemoryWriter::new();
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(memory.clone()))
            .post_filter(|record: &EventRecord| {
                if record.category == CATEGORY_START {
                    Err(LoggerError::other("start rejected"))
                } else {
                    Ok(true)
                }
            })
            .error_policy(ErrorPolicy::rethrow())
            .build()
            .unwrap();

        assert!(logger.begin_job("doomed").is_err());
        assert!(memory.is_empty());
        assert_eq!(logger.metrics().faults_reported(), 1);
    }

    #[test]
    fn test_job_state_is_pooled() {
        let (logger, _memory) = setup();
        let first = logger.begin_job("a").unwrap();
        let first_id = first.id().to_string();
        first.complete().unwrap();
        let second = logger.begin_job("b").unwrap();

        assert_ne!(second.id(), first_id);
        assert_eq!(second.name(), "b");
        assert!(second.fault().is_none());
        assert_eq!(logger.job_pool_metrics().created(), 1);
    }
}
