//! Suppress-or-rethrow policy for pipeline faults
//!
//! Every fault raised while processing an event (filters, renderers, context
//! providers, writers, job tokens) is handed to a single [`ErrorHandler`]. The
//! handler notifies its observers and returns an [`ErrorVerdict`] deciding
//! whether the logging call reports the fault to its caller.
//!
//! # Example
//!
//! ```
//! use rust_event_logger::core::error::LoggerError;
//! use rust_event_logger::core::error_policy::{ErrorHandler, ErrorPolicy, ErrorVerdict};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! let policy = ErrorPolicy::suppress().with_observer(move |_err: &LoggerError| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! let verdict = policy.report_error(&LoggerError::other("sink offline"));
//! assert_eq!(verdict, ErrorVerdict::Suppress);
//! assert_eq!(seen.load(Ordering::Relaxed), 1);
//! ```

use super::error::LoggerError;
use std::fmt;
use std::sync::Arc;

/// Outcome of reporting a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorVerdict {
    /// The call succeeds; the fault has been observed
    Suppress,
    /// The call returns the fault to its caller
    Rethrow,
}

pub trait ErrorHandler: Send + Sync {
    /// Notify observers of `error` and decide whether it is returned
    fn report_error(&self, error: &LoggerError) -> ErrorVerdict;
}

impl<F> ErrorHandler for F
where
    F: Fn(&LoggerError) -> ErrorVerdict + Send + Sync,
{
    fn report_error(&self, error: &LoggerError) -> ErrorVerdict {
        self(error)
    }
}

/// Callback fired for every reported fault
pub type ErrorObserver = Arc<dyn Fn(&LoggerError) + Send + Sync>;

/// The canonical suppress/rethrow handlers
#[derive(Clone)]
pub struct ErrorPolicy {
    verdict: ErrorVerdict,
    observers: Vec<ErrorObserver>,
}

impl ErrorPolicy {
    /// Observe faults and let the logging call succeed
    ///
    /// With no observers subscribed, faults are reported on stderr so they are
    /// never silently lost.
    pub fn suppress() -> Self {
        Self {
            verdict: ErrorVerdict::Suppress,
            observers: Vec::new(),
        }
    }

    /// Observe faults and return them to the caller
    pub fn rethrow() -> Self {
        Self {
            verdict: ErrorVerdict::Rethrow,
            observers: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&LoggerError) + Send + Sync + 'static,
    {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn subscribe(&mut self, observer: ErrorObserver) {
        self.observers.push(observer);
    }

    pub fn verdict(&self) -> ErrorVerdict {
        self.verdict
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::suppress()
    }
}

impl ErrorHandler for ErrorPolicy {
    fn report_error(&self, error: &LoggerError) -> ErrorVerdict {
        for observer in &self.observers {
            // Observer panics stay contained
            if let Err(panic_info) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| observer(error))) {
                let err = LoggerError::panicked("error observer", panic_info);
                eprintln!("[LOGGER ERROR] {}", err);
            }
        }

        if self.observers.is_empty() && self.verdict == ErrorVerdict::Suppress {
            eprintln!("[LOGGER ERROR] {}", error);
        }

        self.verdict
    }
}

impl fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorPolicy")
            .field("verdict", &self.verdict)
            .field("observers", &self.observers.len())
            .finish()
    }
}
