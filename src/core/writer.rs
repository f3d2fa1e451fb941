//! Destination writer traits and the shared writer handle
//!
//! A destination implements one of two traits:
//!
//! - [`EventWriter`] takes `&mut self` and therefore requires synchronization.
//!   The [`WriterHandle`] serializes calls through a mutex owned by that writer
//!   instance, shared by every logger holding a clone of the handle.
//! - [`ConcurrentWriter`] takes `&self` and is internally thread-safe; calls go
//!   straight through.

use super::error::{LoggerError, Result};
use super::event_record::EventRecord;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A destination that must not be called concurrently
pub trait EventWriter: Send {
    fn write(&mut self, record: &EventRecord) -> Result<()>;

    /// Write a batch of records; the slice may be a reused buffer prefix
    fn write_batch(&mut self, records: &[EventRecord]) -> Result<()> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str;
}

/// A destination that is safe to call from many threads at once
pub trait ConcurrentWriter: Send + Sync {
    fn write(&self, record: &EventRecord) -> Result<()>;

    fn write_batch(&self, records: &[EventRecord]) -> Result<()> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str;
}

impl<W: ConcurrentWriter + ?Sized> ConcurrentWriter for Arc<W> {
    fn write(&self, record: &EventRecord) -> Result<()> {
        (**self).write(record)
    }

    fn write_batch(&self, records: &[EventRecord]) -> Result<()> {
        (**self).write_batch(records)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Clone)]
enum Target {
    Exclusive(Arc<Mutex<Box<dyn EventWriter>>>),
    Concurrent(Arc<dyn ConcurrentWriter>),
}

/// Clonable, shareable reference to a destination writer
///
/// Writer faults are returned as [`LoggerError::Writer`] carrying the writer's
/// name.
#[derive(Clone)]
pub struct WriterHandle {
    target: Target,
    name: Arc<str>,
    forwarding: bool,
}

impl WriterHandle {
    /// Wrap a writer that requires synchronization
    pub fn exclusive<W: EventWriter + 'static>(writer: W) -> Self {
        let name: Arc<str> = Arc::from(writer.name());
        Self {
            target: Target::Exclusive(Arc::new(Mutex::new(Box::new(writer)))),
            name,
            forwarding: false,
        }
    }

    /// Wrap an internally thread-safe writer
    pub fn concurrent<W: ConcurrentWriter + 'static>(writer: W) -> Self {
        Self::shared(Arc::new(writer))
    }

    /// Wrap a thread-safe writer the caller keeps a reference to
    pub fn shared(writer: Arc<dyn ConcurrentWriter>) -> Self {
        let name: Arc<str> = Arc::from(writer.name());
        Self {
            target: Target::Concurrent(writer),
            name,
            forwarding: false,
        }
    }

    /// Mark a handle whose writer hands records to another logger's pipeline
    pub(crate) fn into_forwarding(mut self) -> Self {
        self.forwarding = true;
        self
    }

    pub(crate) fn is_forwarding(&self) -> bool {
        self.forwarding
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether calls are serialized through this writer's mutex
    pub fn requires_synchronization(&self) -> bool {
        matches!(self.target, Target::Exclusive(_))
    }

    /// Whether both handles refer to the same writer instance
    pub fn same_writer(&self, other: &WriterHandle) -> bool {
        match (&self.target, &other.target) {
            (Target::Exclusive(a), Target::Exclusive(b)) => Arc::ptr_eq(a, b),
            (Target::Concurrent(a), Target::Concurrent(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }

    pub fn write(&self, record: &EventRecord) -> Result<()> {
        let result = match &self.target {
            Target::Exclusive(writer) => writer.lock().write(record),
            Target::Concurrent(writer) => writer.write(record),
        };
        result.map_err(|e| self.fault(e))
    }

    pub fn write_batch(&self, records: &[EventRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let result = match &self.target {
            Target::Exclusive(writer) => writer.lock().write_batch(records),
            Target::Concurrent(writer) => writer.write_batch(records),
        };
        result.map_err(|e| self.fault(e))
    }

    pub fn flush(&self) -> Result<()> {
        let result = match &self.target {
            Target::Exclusive(writer) => writer.lock().flush(),
            Target::Concurrent(writer) => writer.flush(),
        };
        result.map_err(|e| self.fault(e))
    }

    pub fn close(&self) -> Result<()> {
        let result = match &self.target {
            Target::Exclusive(writer) => writer.lock().close(),
            Target::Concurrent(writer) => writer.close(),
        };
        result.map_err(|e| self.fault(e))
    }

    fn fault(&self, error: LoggerError) -> LoggerError {
        if self.forwarding && error.is_pipeline_fault() {
            return error;
        }
        LoggerError::writer(self.name.as_ref(), error)
    }
}

impl fmt::Debug for WriterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterHandle")
            .field("name", &self.name)
            .field("requires_synchronization", &self.requires_synchronization())
            .finish()
    }
}
