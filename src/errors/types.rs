//! Error type definitions for the report scheduler
//!
//! This module defines all error types used throughout the crate,
//! providing a hierarchical error system that makes debugging and error
//! handling more straightforward.

use thiserror::Error;

/// Top-level error type for the scheduler core
///
/// This enum represents all failure outcomes exposed to callers of the
/// public API. It uses `thiserror` to provide automatic error trait
/// implementations and proper error chaining.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Malformed input: bad cron expression, unknown timezone, missing
    /// required schedule fields. Always surfaced, never retried.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Unknown schedule or report id
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Persistence layer errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Data source loading errors
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Report rendering errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

/// Persistence layer specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem I/O failures
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failures
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Data source loading specific errors
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// The named data source file does not exist
    #[error("Data source not found: {name}")]
    NotFound { name: String },

    /// The data source format is not one of the supported kinds
    #[error("Unsupported data source format: {format}")]
    UnsupportedFormat { format: String },

    /// The data source exists but its content could not be parsed
    #[error("Parse error in data source '{name}': {message}")]
    Parse { name: String, message: String },

    /// I/O failure while reading the data source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Report rendering specific errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// The renderer rejected the report
    #[error("Render failed: {message}")]
    Failed { message: String },

    /// I/O failure while writing or inspecting the artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Notification delivery specific errors
///
/// These are always caught and logged inside the pipeline; delivery is an
/// optional enhancement and never a hard dependency of a run.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// The mail transport refused or failed to deliver the message
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Building an attachment failed
    #[error("Attachment error: {message}")]
    Attachment { message: String },
}

/// Convenience methods for creating common error types
impl SchedulerError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error for a resource/id pair
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }
}

impl RenderError {
    /// Create a render failure with a custom message
    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

impl NotificationError {
    /// Create a transport error with a custom message
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Result alias for top-level scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Result alias for persistence operations
pub type StorageResult<T> = Result<T, StorageError>;
