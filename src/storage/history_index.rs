//! Durable, queryable catalog of completed report runs
//!
//! A single `index.json` document holds the ordered record list; the only
//! per-record file is the generated artifact itself. The catalog lives in
//! memory behind an async `RwLock` and is rewritten atomically on every
//! mutation, newest-first. Mutations stage on a copy and commit to memory
//! only after the persist succeeds, so a failed write leaves the in-memory
//! catalog matching `index.json`.

use std::path::PathBuf;

use chrono::{Datelike, Duration, Utc};
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{SchedulerResult, StorageError, StorageResult};
use crate::models::{
    HistoryFilter, HistoryPage, HistoryStatistics, ReportRecord, ReportRecordDraft,
};
use crate::storage::write_atomic;

const INDEX_FILE: &str = "index.json";

/// Catalog of completed runs, backed by one atomic index document
#[derive(Debug)]
pub struct HistoryIndex {
    index_path: PathBuf,
    reports_root: PathBuf,
    records: RwLock<Vec<ReportRecord>>,
}

impl HistoryIndex {
    /// Open (and create if needed) the catalog under `history_dir`
    ///
    /// `reports_root` anchors the relative artifact paths recorded in the
    /// catalog, for artifact deletion during `delete` and cleanup.
    pub async fn open(history_dir: PathBuf, reports_root: PathBuf) -> StorageResult<Self> {
        tokio::fs::create_dir_all(&history_dir).await?;
        let index_path = history_dir.join(INDEX_FILE);

        let records = match tokio::fs::read(&index_path).await {
            Ok(bytes) => {
                let mut records: Vec<ReportRecord> = serde_json::from_slice(&bytes)?;
                records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                records
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            index_path,
            reports_root,
            records: RwLock::new(records),
        })
    }

    /// Insert one record, assigning id/timestamp when absent, and persist
    /// the whole catalog atomically
    pub async fn add(&self, draft: ReportRecordDraft) -> SchedulerResult<ReportRecord> {
        let record = ReportRecord {
            id: draft.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: draft.title,
            path: draft.path,
            schedule_id: draft.schedule_id,
            schedule_name: draft.schedule_name,
            timestamp: draft.timestamp.unwrap_or_else(Utc::now),
            tags: draft.tags,
        };

        let mut records = self.records.write().await;
        let mut staged = records.clone();
        staged.push(record.clone());
        staged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.persist(&staged).await?;
        *records = staged;

        debug!(record_id = %record.id, title = %record.title, "Added history record");
        Ok(record)
    }

    /// Conjunctive filter with paging; always newest-first
    pub async fn query(&self, filter: &HistoryFilter) -> HistoryPage {
        let records = self.records.read().await;
        let matching: Vec<&ReportRecord> = records
            .iter()
            .filter(|record| matches_filter(record, filter))
            .collect();

        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        HistoryPage {
            records: page,
            total,
        }
    }

    /// Look up one record by id
    pub async fn get(&self, id: &str) -> Option<ReportRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Remove the catalog entry; returns whether anything was removed
    ///
    /// With `also_delete_artifact`, the artifact file is removed best-effort:
    /// a missing or undeletable artifact logs a warning and never fails the
    /// catalog removal.
    pub async fn delete(&self, id: &str, also_delete_artifact: bool) -> SchedulerResult<bool> {
        let mut records = self.records.write().await;
        let Some(position) = records.iter().position(|record| record.id == id) else {
            return Ok(false);
        };

        let mut staged = records.clone();
        let record = staged.remove(position);
        self.persist(&staged).await?;
        *records = staged;
        drop(records);

        if also_delete_artifact {
            self.remove_artifact(&record).await;
        }
        debug!(record_id = %id, "Deleted history record");
        Ok(true)
    }

    /// Set-union `tags` into the record's tag set
    ///
    /// Adding an already-present tag is a success no-op. Returns false on an
    /// unknown id.
    pub async fn add_tags(&self, id: &str, tags: &[String]) -> SchedulerResult<bool> {
        self.mutate_tags(id, |set| {
            for tag in tags {
                set.insert(tag.clone());
            }
        })
        .await
    }

    /// Set-difference `tags` out of the record's tag set
    ///
    /// Removing an absent tag is a success no-op. Returns false on an
    /// unknown id.
    pub async fn remove_tags(&self, id: &str, tags: &[String]) -> SchedulerResult<bool> {
        self.mutate_tags(id, |set| {
            for tag in tags {
                set.remove(tag);
            }
        })
        .await
    }

    /// Delete every record (and artifact, best-effort) older than
    /// `max_age_days`; returns the count removed
    ///
    /// `max_age_days <= 0` disables cleanup entirely: retention is explicit
    /// opt-in, never implicit.
    pub async fn cleanup_old_reports(&self, max_age_days: i64) -> SchedulerResult<usize> {
        if max_age_days <= 0 {
            debug!("History cleanup disabled (max_age_days <= 0)");
            return Ok(0);
        }

        let cutoff = Utc::now() - Duration::days(max_age_days);
        let mut records = self.records.write().await;
        let (expired, kept): (Vec<ReportRecord>, Vec<ReportRecord>) = records
            .iter()
            .cloned()
            .partition(|record| record.timestamp < cutoff);

        if expired.is_empty() {
            return Ok(0);
        }

        self.persist(&kept).await?;
        *records = kept;
        drop(records);

        let removed = expired.len();
        join_all(expired.iter().map(|record| self.remove_artifact(record))).await;

        info!(
            removed,
            max_age_days, "Removed expired reports from history"
        );
        Ok(removed)
    }

    /// Pure aggregate over the catalog: totals per schedule and per calendar
    /// month, plus the oldest/newest timestamps
    pub async fn statistics(&self) -> HistoryStatistics {
        let records = self.records.read().await;

        let mut by_schedule = std::collections::BTreeMap::new();
        let mut by_month = std::collections::BTreeMap::new();
        for record in records.iter() {
            *by_schedule
                .entry(record.schedule_name.clone())
                .or_insert(0) += 1;
            let month = format!(
                "{:04}-{:02}",
                record.timestamp.year(),
                record.timestamp.month()
            );
            *by_month.entry(month).or_insert(0) += 1;
        }

        HistoryStatistics {
            total_reports: records.len(),
            by_schedule,
            by_month,
            // Records are kept newest-first
            oldest: records.last().map(|record| record.timestamp),
            newest: records.first().map(|record| record.timestamp),
        }
    }

    async fn mutate_tags<F>(&self, id: &str, mutate: F) -> SchedulerResult<bool>
    where
        F: FnOnce(&mut std::collections::BTreeSet<String>),
    {
        let mut records = self.records.write().await;
        let mut staged = records.clone();
        let Some(record) = staged.iter_mut().find(|record| record.id == id) else {
            return Ok(false);
        };

        mutate(&mut record.tags);
        self.persist(&staged).await?;
        *records = staged;
        Ok(true)
    }

    async fn persist(&self, records: &[ReportRecord]) -> SchedulerResult<()> {
        let bytes = serde_json::to_vec_pretty(records).map_err(StorageError::from)?;
        write_atomic(&self.index_path, &bytes).await?;
        Ok(())
    }

    async fn remove_artifact(&self, record: &ReportRecord) {
        let artifact = self.reports_root.join(&record.path);
        if let Err(e) = tokio::fs::remove_file(&artifact).await {
            warn!(
                record_id = %record.id,
                artifact = %artifact.display(),
                "Failed to remove report artifact: {e}"
            );
        }
    }
}

fn matches_filter(record: &ReportRecord, filter: &HistoryFilter) -> bool {
    if let Some(schedule_id) = &filter.schedule_id {
        if record.schedule_id.as_deref() != Some(schedule_id.as_str()) {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !record.title.to_lowercase().contains(&needle)
            && !record.schedule_name.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if let Some(from) = filter.from {
        if record.timestamp < from {
            return false;
        }
    }
    if let Some(to) = filter.to {
        if record.timestamp > to {
            return false;
        }
    }
    if !filter.tags.is_empty() && !filter.tags.iter().any(|tag| record.tags.contains(tag)) {
        return false;
    }
    true
}
