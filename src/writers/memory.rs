//! In-memory capture writer

use crate::core::{ConcurrentWriter, EventRecord, LoggerError, Result, Severity};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Captured {
    records: Mutex<Vec<EventRecord>>,
    batches: AtomicU64,
    flushes: AtomicU64,
    closed: AtomicBool,
}

/// Keeps every written record in memory
///
/// Clones share the same buffer, so a test can hand one clone to the logger
/// and inspect another.
///
/// # Example
///
/// ```
/// use rust_event_logger::prelude::*;
///
/// let memory = MemoryWriter::new();
/// let logger = Logger::builder()
///     .writer(WriterHandle::concurrent(memory.clone()))
///     .build()
///     .unwrap();
///
/// logger.warning("cache miss").unwrap();
/// assert_eq!(memory.len(), 1);
/// assert_eq!(memory.records()[0].name, "cache miss");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryWriter {
    name: String,
    captured: Arc<Captured>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            captured: Arc::new(Captured::default()),
        }
    }

    /// Copy of every record written so far, in arrival order
    pub fn records(&self) -> Vec<EventRecord> {
        self.captured.records.lock().clone()
    }

    /// Remove and return every captured record
    pub fn take(&self) -> Vec<EventRecord> {
        std::mem::take(&mut *self.captured.records.lock())
    }

    pub fn names(&self) -> Vec<String> {
        self.captured.records.lock().iter().map(|r| r.name.clone()).collect()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.captured
            .records
            .lock()
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    pub fn len(&self) -> usize {
        self.captured.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.captured.records.lock().clear();
    }

    /// Number of `write_batch` calls received
    pub fn batch_count(&self) -> u64 {
        self.captured.batches.load(Ordering::Relaxed)
    }

    pub fn flush_count(&self) -> u64 {
        self.captured.flushes.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.captured.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(LoggerError::LoggerStopped);
        }
        Ok(())
    }
}

impl Default for MemoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentWriter for MemoryWriter {
    fn write(&self, record: &EventRecord) -> Result<()> {
        self.ensure_open()?;
        self.captured.records.lock().push(record.clone());
        Ok(())
    }

    fn write_batch(&self, records: &[EventRecord]) -> Result<()> {
        self.ensure_open()?;
        self.captured.batches.fetch_add(1, Ordering::Relaxed);
        self.captured.records.lock().extend_from_slice(records);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.captured.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.captured.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_buffer() {
        let memory = MemoryWriter::new();
        let clone = memory.clone();
        clone.write(&EventRecord::new(Severity::Information, "a")).unwrap();
        clone.write(&EventRecord::new(Severity::Error, "b")).unwrap();

        assert_eq!(memory.names(), vec!["a", "b"]);
        assert_eq!(memory.count_severity(Severity::Error), 1);
    }

    #[test]
    fn test_batch_is_counted_once() {
        let memory = MemoryWriter::new();
        let records = vec![EventRecord::default(); 4];
        memory.write_batch(&records).unwrap();
        assert_eq!(memory.len(), 4);
        assert_eq!(memory.batch_count(), 1);
    }

    #[test]
    fn test_write_after_close_fails() {
        let memory = MemoryWriter::new();
        memory.close().unwrap();
        assert!(memory.is_closed());
        assert!(matches!(
            memory.write(&EventRecord::default()),
            Err(LoggerError::LoggerStopped)
        ));
    }

    #[test]
    fn test_take_drains() {
        let memory = MemoryWriter::new();
        memory.write(&EventRecord::default()).unwrap();
        assert_eq!(memory.take().len(), 1);
        assert!(memory.is_empty());
    }
}
