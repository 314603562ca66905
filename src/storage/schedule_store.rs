//! Durable CRUD of schedule definitions
//!
//! One JSON file per schedule under the configured directory, keyed by the
//! schedule id. The store is deliberately unaware of timers: deleting or
//! deactivating a schedule here does not stop a live timer, the caller owns
//! that coupling (see `ReportSchedulerApi`), which keeps storage and
//! scheduling independently testable.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{SchedulerError, SchedulerResult, StorageResult};
use crate::models::{Schedule, ScheduleCreateRequest, ScheduleUpdateRequest};
use crate::storage::write_atomic;

/// File-backed schedule store
///
/// Holds no in-memory cache; every operation goes to the filesystem so two
/// handles over the same directory never observe divergent state.
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    dir: PathBuf,
}

impl ScheduleStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub async fn new(dir: PathBuf) -> StorageResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Validate the request, assign an id when absent, and persist the
    /// schedule as one durable unit
    pub async fn create(&self, request: ScheduleCreateRequest) -> SchedulerResult<Schedule> {
        if request.name.trim().is_empty() {
            return Err(SchedulerError::validation("schedule name must not be empty"));
        }
        if request.report_config.title.trim().is_empty() {
            return Err(SchedulerError::validation(
                "report config title must not be empty",
            ));
        }

        let id = match request.id {
            Some(id) => {
                validate_id(&id)?;
                if self.get(&id).await?.is_some() {
                    return Err(SchedulerError::validation(format!(
                        "schedule id '{id}' already exists"
                    )));
                }
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        let now = Utc::now();
        let schedule = Schedule {
            id,
            name: request.name,
            cron_expression: request.cron_expression,
            timezone: request.timezone,
            report_config: request.report_config,
            recipients: request.recipients,
            active: request.active,
            created_at: now,
            updated_at: now,
        };

        self.persist(&schedule).await?;
        debug!(schedule_id = %schedule.id, name = %schedule.name, "Created schedule");
        Ok(schedule)
    }

    /// Load one schedule by id
    pub async fn get(&self, id: &str) -> SchedulerResult<Option<Schedule>> {
        validate_id(id)?;
        let path = self.schedule_path(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let schedule = serde_json::from_slice(&bytes)
                    .map_err(crate::errors::StorageError::from)?;
                Ok(Some(schedule))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(crate::errors::StorageError::from(e).into()),
        }
    }

    /// Load every persisted schedule, unordered
    ///
    /// Files that fail to parse are skipped with a warning so one corrupt
    /// file never hides the rest.
    pub async fn list(&self) -> SchedulerResult<Vec<Schedule>> {
        let mut schedules = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(crate::errors::StorageError::from)?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(crate::errors::StorageError::from)?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<Schedule>(&bytes) {
                    Ok(schedule) => schedules.push(schedule),
                    Err(e) => warn!(path = %path.display(), "Skipping unparseable schedule file: {e}"),
                },
                Err(e) => warn!(path = %path.display(), "Skipping unreadable schedule file: {e}"),
            }
        }

        Ok(schedules)
    }

    /// Merge the patch's `Some` fields into the stored schedule
    pub async fn update(
        &self,
        id: &str,
        patch: ScheduleUpdateRequest,
    ) -> SchedulerResult<Schedule> {
        let mut schedule = self
            .get(id)
            .await?
            .ok_or_else(|| SchedulerError::not_found("schedule", id))?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(SchedulerError::validation("schedule name must not be empty"));
            }
            schedule.name = name;
        }
        if let Some(cron_expression) = patch.cron_expression {
            schedule.cron_expression = cron_expression;
        }
        if let Some(timezone) = patch.timezone {
            schedule.timezone = timezone;
        }
        if let Some(report_config) = patch.report_config {
            if report_config.title.trim().is_empty() {
                return Err(SchedulerError::validation(
                    "report config title must not be empty",
                ));
            }
            schedule.report_config = report_config;
        }
        if let Some(recipients) = patch.recipients {
            schedule.recipients = recipients;
        }
        if let Some(active) = patch.active {
            schedule.active = active;
        }
        schedule.updated_at = Utc::now();

        self.persist(&schedule).await?;
        debug!(schedule_id = %schedule.id, "Updated schedule");
        Ok(schedule)
    }

    /// Remove the persisted schedule; returns whether anything was removed
    ///
    /// Does not stop any associated live timer.
    pub async fn delete(&self, id: &str) -> SchedulerResult<bool> {
        validate_id(id)?;
        match tokio::fs::remove_file(self.schedule_path(id)).await {
            Ok(()) => {
                debug!(schedule_id = %id, "Deleted schedule");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(crate::errors::StorageError::from(e).into()),
        }
    }

    async fn persist(&self, schedule: &Schedule) -> SchedulerResult<()> {
        let bytes = serde_json::to_vec_pretty(schedule)
            .map_err(crate::errors::StorageError::from)?;
        write_atomic(&self.schedule_path(&schedule.id), &bytes).await?;
        Ok(())
    }

    fn schedule_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

/// Ids become file names, so they must be non-empty and free of path syntax
fn validate_id(id: &str) -> SchedulerResult<()> {
    if id.is_empty() || id.contains(['/', '\\', '.']) {
        return Err(SchedulerError::validation(format!(
            "invalid schedule id '{id}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataSourceSpec, ReportConfig};

    fn sample_request(id: Option<&str>) -> ScheduleCreateRequest {
        ScheduleCreateRequest {
            id: id.map(str::to_string),
            name: "Daily sales".to_string(),
            cron_expression: "0 9 * * *".to_string(),
            timezone: "UTC".to_string(),
            report_config: ReportConfig {
                title: "Daily".to_string(),
                charts: vec![],
                data_source: DataSourceSpec {
                    name: "sales".to_string(),
                    format: "json".to_string(),
                },
            },
            recipients: vec![],
            active: true,
        }
    }

    async fn temp_store() -> (tempfile::TempDir, ScheduleStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ScheduleStore::new(dir.path().join("schedules"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_get_round_trip() {
        let (_dir, store) = temp_store().await;

        let created = store.create(sample_request(None)).await.unwrap();
        assert!(!created.id.is_empty());

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Daily sales");
        assert_eq!(fetched.cron_expression, "0 9 * * *");
        assert_eq!(fetched.timezone, "UTC");
        assert!(fetched.active);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_name_and_title() {
        let (_dir, store) = temp_store().await;

        let mut request = sample_request(None);
        request.name = "  ".to_string();
        assert!(matches!(
            store.create(request).await,
            Err(SchedulerError::Validation { .. })
        ));

        let mut request = sample_request(None);
        request.report_config.title = String::new();
        assert!(matches!(
            store.create(request).await,
            Err(SchedulerError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let (_dir, store) = temp_store().await;

        store.create(sample_request(Some("s1"))).await.unwrap();
        assert!(matches!(
            store.create(sample_request(Some("s1"))).await,
            Err(SchedulerError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_merges_patch_fields_only() {
        let (_dir, store) = temp_store().await;
        let created = store.create(sample_request(Some("s1"))).await.unwrap();

        let updated = store
            .update(
                "s1",
                ScheduleUpdateRequest {
                    cron_expression: Some("*/5 * * * *".to_string()),
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.cron_expression, "*/5 * * * *");
        assert!(!updated.active);
        // Untouched fields survive
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.timezone, created.timezone);
        assert!(updated.updated_at >= created.updated_at);

        let fetched = store.get("s1").await.unwrap().unwrap();
        assert_eq!(fetched.cron_expression, "*/5 * * * *");
        assert!(!fetched.active);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(
            store
                .update("missing", ScheduleUpdateRequest::default())
                .await,
            Err(SchedulerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let (_dir, store) = temp_store().await;
        store.create(sample_request(Some("s1"))).await.unwrap();

        assert!(store.delete("s1").await.unwrap());
        assert!(!store.delete("s1").await.unwrap());
        assert!(store.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_files() {
        let (dir, store) = temp_store().await;
        store.create(sample_request(Some("good"))).await.unwrap();

        tokio::fs::write(dir.path().join("schedules/bad.json"), b"{not json")
            .await
            .unwrap();

        let schedules = store.list().await.unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].id, "good");
    }

    #[tokio::test]
    async fn test_path_traversal_ids_rejected() {
        let (_dir, store) = temp_store().await;
        assert!(store.get("../escape").await.is_err());
        assert!(store.delete("a/b").await.is_err());
    }
}
