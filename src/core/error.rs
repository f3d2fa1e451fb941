//! Error types for the event pipeline

use std::fmt;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// A fault attached to an event record or recorded against a job.
///
/// Shared so a record can be cloned into batch buffers without copying the error.
pub type Fault = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline stage in which a fault was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    PreFilter,
    Acquire,
    Render,
    Enrich,
    PostFilter,
    Dispatch,
    Job,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            PipelineStage::PreFilter => "pre-allocation filtering",
            PipelineStage::Acquire => "acquiring a record",
            PipelineStage::Render => "rendering properties",
            PipelineStage::Enrich => "running context providers",
            PipelineStage::PostFilter => "post-enrichment filtering",
            PipelineStage::Dispatch => "dispatching to the writer",
            PipelineStage::Job => "tracking a job",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A caller passed a value the operation cannot accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A pool or worker was used after shutdown
    #[error("Resource unavailable: {resource} has been shut down")]
    ResourceUnavailable { resource: String },

    /// Fault raised while filtering, rendering or enriching a single event
    #[error("Pipeline fault while {stage}: {source}")]
    Pipeline {
        stage: PipelineStage,
        #[source]
        source: Box<LoggerError>,
    },

    /// Fault raised by a destination writer
    #[error("Writer '{writer}' failed: {source}")]
    Writer {
        writer: String,
        #[source]
        source: Box<LoggerError>,
    },

    /// A collaborator panicked
    #[error("Panic in {context}: {message}")]
    Panicked { context: String, message: String },

    /// Writer already closed
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        LoggerError::InvalidArgument(msg.into())
    }

    /// Create a resource unavailable error
    pub fn unavailable(resource: impl Into<String>) -> Self {
        LoggerError::ResourceUnavailable {
            resource: resource.into(),
        }
    }

    /// Wrap a fault into a pipeline fault unless it already is one
    pub fn pipeline(stage: PipelineStage, source: LoggerError) -> Self {
        if source.is_pipeline_fault() {
            return source;
        }
        LoggerError::Pipeline {
            stage,
            source: Box::new(source),
        }
    }

    /// Wrap a writer fault, keeping the name of the offending writer
    pub fn writer(writer: impl Into<String>, source: LoggerError) -> Self {
        if matches!(source, LoggerError::Writer { .. }) {
            return source;
        }
        LoggerError::Writer {
            writer: writer.into(),
            source: Box::new(source),
        }
    }

    /// Convert a caught panic payload into an error
    pub fn panicked(context: impl Into<String>, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        LoggerError::Panicked {
            context: context.into(),
            message,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error is already the pipeline's own fault kind
    pub fn is_pipeline_fault(&self) -> bool {
        matches!(self, LoggerError::Pipeline { .. } | LoggerError::Writer { .. })
    }

    /// Name of the writer that raised this fault, if any
    pub fn writer_name(&self) -> Option<&str> {
        match self {
            LoggerError::Writer { writer, .. } => Some(writer),
            LoggerError::Pipeline { source, .. } => source.writer_name(),
            _ => None,
        }
    }
}
