//! Cron timer registry and trigger dispatch

pub mod cron_engine;

pub use cron_engine::{CronEngine, EngineStats, ScheduleState};
