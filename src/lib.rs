//! Cron-driven report generation engine
//!
//! Persists schedule definitions durably, fires them on timezone-aware cron
//! cadences, runs a multi-step generation pipeline, and records every
//! completed run in a queryable, retention-managed history catalog.

pub mod api;
pub mod config;
pub mod datasource;
pub mod engine;
pub mod errors;
pub mod models;
pub mod notifications;
pub mod pipeline;
pub mod render;
pub mod storage;
pub mod utils;
