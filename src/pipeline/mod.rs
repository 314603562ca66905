//! The report generation pipeline
//!
//! One run is a deterministic sequence: load data, shape charts, render,
//! run best-effort post-render hooks, append to history, notify. See
//! [`executor::ReportPipeline`].

pub mod charts;
pub mod executor;
pub mod hooks;

pub use executor::ReportPipeline;
