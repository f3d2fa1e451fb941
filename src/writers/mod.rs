//! Destination writers

pub mod batch;
#[cfg(feature = "console")]
pub mod console;
pub mod forwarding;
pub mod memory;

pub use batch::{AsyncBatchWriter, AsyncBatchWriterBuilder, BatchMetrics};
#[cfg(feature = "console")]
pub use console::{ConsoleFormat, ConsoleWriter};
pub use forwarding::ForwardingWriter;
pub use memory::MemoryWriter;
