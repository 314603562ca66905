//! Domain models for schedules, report configuration, and run history

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A single row loaded from a data source
///
/// Rows are schemaless JSON objects; chart shaping picks fields out of them
/// by name.
pub type DataRow = serde_json::Map<String, serde_json::Value>;

/// A persisted definition of a recurring report-generation job
///
/// Invariant: a schedule may only hold a live timer if `active` is true and
/// `cron_expression` parses; invalid or inactive schedules remain persisted
/// but dormant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    /// 5- or 6-field cron syntax; 5-field expressions are normalized by
    /// prepending a seconds field of `0` before parsing.
    pub cron_expression: String,
    /// IANA timezone name the cron cadence is evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub report_config: ReportConfig,
    /// Email recipients for completed runs; empty disables notification
    #[serde(default)]
    pub recipients: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a single report generation produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub title: String,
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
    pub data_source: DataSourceSpec,
}

/// One chart within a report
///
/// `chart_type` is free-form on input and parsed at shaping time, so an
/// unknown kind skips that chart with a warning instead of failing
/// deserialization of the whole schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub chart_type: String,
    /// Field whose values become category labels (bar/line/pie)
    pub label_field: Option<String>,
    /// Field whose values are aggregated per label (bar/line/pie)
    pub value_field: Option<String>,
    /// Columns to project for table charts; empty means all fields
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Supported renderable chart kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Table,
}

/// Named data source backing a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceSpec {
    pub name: String,
    /// `"json"` or `"csv"`, parsed at load time
    pub format: String,
}

/// Supported data source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DataFormat {
    Json,
    Csv,
}

/// Request payload for creating a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCreateRequest {
    /// Optional caller-supplied id; generated (UUID v4) when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub cron_expression: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub report_config: ReportConfig,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Partial update for a schedule; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleUpdateRequest {
    pub name: Option<String>,
    pub cron_expression: Option<String>,
    pub timezone: Option<String>,
    pub report_config: Option<ReportConfig>,
    pub recipients: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// Catalog entry describing one completed report generation
///
/// Every field except `tags` is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: String,
    pub title: String,
    /// Artifact location relative to the reports root
    pub path: PathBuf,
    /// None for manual runs outside any schedule
    pub schedule_id: Option<String>,
    pub schedule_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// Input for appending a record to the history catalog
///
/// `id` and `timestamp` are assigned when absent.
#[derive(Debug, Clone, Default)]
pub struct ReportRecordDraft {
    pub id: Option<String>,
    pub title: String,
    pub path: PathBuf,
    pub schedule_id: Option<String>,
    pub schedule_name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub tags: BTreeSet<String>,
}

/// Conjunctive filter over the history catalog
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Exact schedule id match
    pub schedule_id: Option<String>,
    /// Case-insensitive substring match over title and schedule name
    pub search: Option<String>,
    /// Inclusive lower timestamp bound
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound
    pub to: Option<DateTime<Utc>>,
    /// Any-of tag match; empty means no tag constraint
    pub tags: Vec<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// One page of history results plus the filtered total
///
/// `total` counts every record matching the filter regardless of paging, so
/// "no more results" is distinguishable from "zero matches".
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub records: Vec<ReportRecord>,
    pub total: usize,
}

/// Side-effect-free aggregate over the history catalog
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStatistics {
    pub total_reports: usize,
    /// Report counts keyed by schedule name
    pub by_schedule: std::collections::BTreeMap<String, usize>,
    /// Report counts keyed by calendar month (`YYYY-MM`)
    pub by_month: std::collections::BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_active() -> bool {
    true
}
