//! Error handling for the report scheduler
//!
//! Provides a layered error system: a top-level [`SchedulerError`] plus
//! per-concern error types that convert into it.

pub mod types;

pub use types::{
    DataSourceError, NotificationError, RenderError, SchedulerError, SchedulerResult,
    StorageError, StorageResult,
};
