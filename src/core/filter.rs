//! Filter stages of the event pipeline
//!
//! Two extension points decide whether an event is kept:
//!
//! - [`PreFilter`] runs before a record exists and sees only the raw call
//!   arguments, so rejected call sites cost no pool traffic at all.
//! - [`EventFilter`] runs after context providers have enriched the record,
//!   for predicates that depend on enriched properties.
//!
//! Both are implemented for closures of the matching shape.

use super::error::Result;
use super::event_record::EventRecord;
use super::severity::Severity;

/// Raw call arguments seen by a [`PreFilter`]
#[derive(Debug, Clone, Copy)]
pub struct EventHeader<'a> {
    pub message: &'a str,
    pub severity: Severity,
    pub category: &'a str,
    pub source: &'a str,
    pub source_method: Option<&'a str>,
}

/// Cheap filter evaluated before any record is constructed
pub trait PreFilter: Send + Sync {
    fn should_log(&self, header: &EventHeader<'_>) -> Result<bool>;
}

/// Filter evaluated on a populated record
pub trait EventFilter: Send + Sync {
    fn should_process(&self, record: &EventRecord) -> Result<bool>;
}

impl<F> PreFilter for F
where
    F: Fn(&EventHeader<'_>) -> Result<bool> + Send + Sync,
{
    fn should_log(&self, header: &EventHeader<'_>) -> Result<bool> {
        self(header)
    }
}

impl<F> EventFilter for F
where
    F: Fn(&EventRecord) -> Result<bool> + Send + Sync,
{
    fn should_process(&self, record: &EventRecord) -> Result<bool> {
        self(record)
    }
}

/// Keeps events at or above a minimum severity
#[derive(Debug, Clone, Copy)]
pub struct SeverityFilter {
    min_severity: Severity,
}

impl SeverityFilter {
    pub fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }
}

impl PreFilter for SeverityFilter {
    #[inline]
    fn should_log(&self, header: &EventHeader<'_>) -> Result<bool> {
        Ok(header.severity >= self.min_severity)
    }
}

impl EventFilter for SeverityFilter {
    #[inline]
    fn should_process(&self, record: &EventRecord) -> Result<bool> {
        Ok(record.severity >= self.min_severity)
    }
}
