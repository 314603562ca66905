//! Default configuration values

pub const DEFAULT_SCHEDULES_PATH: &str = "./data/schedules";
pub const DEFAULT_HISTORY_PATH: &str = "./data/history";
pub const DEFAULT_REPORTS_PATH: &str = "./data/reports";
pub const DEFAULT_DATA_PATH: &str = "./data/sources";

/// Retention disabled by default; cleanup is explicit opt-in
pub const DEFAULT_MAX_REPORT_AGE_DAYS: i64 = 0;
pub const DEFAULT_CLEANUP_INTERVAL: &str = "12h";

pub const DEFAULT_FROM_ADDRESS: &str = "reports@localhost";
pub const DEFAULT_SUBJECT_PREFIX: &str = "[report-scheduler] ";
