//! Child-to-parent forwarding writer

use crate::core::{ConcurrentWriter, EventRecord, Logger, Result, WriterHandle};
use std::fmt;

/// Hands every record to another logger's pipeline
///
/// This is the destination of a child logger. Faults the parent already
/// reported to its error policy come back as pipeline faults and are passed
/// through unchanged, so the child does not report them a second time.
pub struct ForwardingWriter {
    parent: Logger,
    name: String,
}

impl ForwardingWriter {
    pub fn new(parent: Logger) -> Self {
        let name = format!("forward({})", parent.writer().name());
        Self { parent, name }
    }

    /// Writer handle for a child logger of `parent`
    pub fn handle(parent: Logger) -> WriterHandle {
        WriterHandle::concurrent(Self::new(parent)).into_forwarding()
    }

    pub fn parent(&self) -> &Logger {
        &self.parent
    }
}

impl ConcurrentWriter for ForwardingWriter {
    fn write(&self, record: &EventRecord) -> Result<()> {
        self.parent.write_event(record)
    }

    fn write_batch(&self, records: &[EventRecord]) -> Result<()> {
        self.parent.write_batch(records)
    }

    fn flush(&self) -> Result<()> {
        self.parent.flush()
    }

    /// The parent outlives its children; closing a child leaves it open
    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ForwardingWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingWriter")
            .field("name", &self.name)
            .finish()
    }
}
