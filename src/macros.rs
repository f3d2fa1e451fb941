//! Logging macros with `format!`-style arguments
//!
//! Each macro records the calling module and line as the event's
//! source-method and source-line, and evaluates to the `Result` of the write.
//!
//! # Examples
//!
//! ```
//! use rust_event_logger::prelude::*;
//! use rust_event_logger::info;
//!
//! let memory = MemoryWriter::new();
//! let logger = Logger::builder()
//!     .writer(WriterHandle::concurrent(memory.clone()))
//!     .build()
//!     .unwrap();
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port).unwrap();
//!
//! let record = &memory.records()[0];
//! assert_eq!(record.name, "Server listening on port 8080");
//! assert!(record.source_line.is_some());
//! ```

/// Write an event at the given severity.
///
/// # Examples
///
/// ```
/// # use rust_event_logger::prelude::*;
/// # let logger = Logger::builder().writer(WriterHandle::concurrent(MemoryWriter::new())).build().unwrap();
/// use rust_event_logger::log_event;
/// log_event!(logger, Severity::Information, "Simple message").unwrap();
/// log_event!(logger, Severity::Error, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log_event {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger
            .event($severity, &::std::format!($($arg)+))
            .location(::std::module_path!(), ::std::line!())
            .write()
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!($logger, $crate::Severity::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!($logger, $crate::Severity::Debug, $($arg)+)
    };
}

/// Write an Information event.
///
/// # Examples
///
/// ```
/// # use rust_event_logger::prelude::*;
/// # let logger = Logger::builder().writer(WriterHandle::concurrent(MemoryWriter::new())).build().unwrap();
/// use rust_event_logger::info;
/// info!(logger, "Processing {} items", 100).unwrap();
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!($logger, $crate::Severity::Information, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!($logger, $crate::Severity::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!($logger, $crate::Severity::Error, $($arg)+)
    };
}

/// Write a Critical event.
///
/// # Examples
///
/// ```
/// # use rust_event_logger::prelude::*;
/// # let logger = Logger::builder().writer(WriterHandle::concurrent(MemoryWriter::new())).build().unwrap();
/// use rust_event_logger::critical;
/// critical!(logger, "Database connection lost").unwrap();
/// ```
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!($logger, $crate::Severity::Critical, $($arg)+)
    };
}
