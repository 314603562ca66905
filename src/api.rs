//! Facade exposed to the host CLI/API layer
//!
//! Schedule mutations and timer registration are deliberately decoupled at
//! the store/engine level; this facade is the one place that performs the
//! coupling, so hosts get consistent behavior without the store and engine
//! ever calling each other.

use std::sync::Arc;

use tracing::warn;

use crate::engine::CronEngine;
use crate::errors::SchedulerResult;
use crate::models::{
    HistoryFilter, HistoryPage, HistoryStatistics, ReportRecord, Schedule,
    ScheduleCreateRequest, ScheduleUpdateRequest,
};
use crate::storage::{HistoryIndex, ScheduleStore};

/// Unified entry point over schedules, execution, and history
pub struct ReportSchedulerApi {
    store: Arc<ScheduleStore>,
    engine: Arc<CronEngine>,
    history: Arc<HistoryIndex>,
}

impl ReportSchedulerApi {
    pub fn new(
        store: Arc<ScheduleStore>,
        engine: Arc<CronEngine>,
        history: Arc<HistoryIndex>,
    ) -> Self {
        Self {
            store,
            engine,
            history,
        }
    }

    /// Persist a new schedule and register it when active
    ///
    /// An unparseable cron expression does not fail creation; the schedule
    /// is persisted dormant with a warning, matching engine startup
    /// behavior.
    pub async fn create_schedule(
        &self,
        request: ScheduleCreateRequest,
    ) -> SchedulerResult<Schedule> {
        let schedule = self.store.create(request).await?;
        if schedule.active {
            if let Err(e) = self.engine.register(schedule.clone()).await {
                warn!(
                    schedule_id = %schedule.id,
                    "Created schedule left dormant, registration failed: {e}"
                );
            }
        }
        Ok(schedule)
    }

    pub async fn get_schedule(&self, id: &str) -> SchedulerResult<Option<Schedule>> {
        self.store.get(id).await
    }

    pub async fn list_schedules(&self) -> SchedulerResult<Vec<Schedule>> {
        self.store.list().await
    }

    /// Apply a partial update, then re-register or unregister the timer to
    /// match the new `active`/cron state
    pub async fn update_schedule(
        &self,
        id: &str,
        patch: ScheduleUpdateRequest,
    ) -> SchedulerResult<Schedule> {
        let schedule = self.store.update(id, patch).await?;
        if schedule.active {
            if let Err(e) = self.engine.register(schedule.clone()).await {
                self.engine.unregister(id).await;
                warn!(
                    schedule_id = %id,
                    "Updated schedule left dormant, registration failed: {e}"
                );
            }
        } else {
            self.engine.unregister(id).await;
        }
        Ok(schedule)
    }

    /// Stop the timer and remove the persisted schedule
    pub async fn delete_schedule(&self, id: &str) -> SchedulerResult<bool> {
        self.engine.unregister(id).await;
        self.store.delete(id).await
    }

    /// Execute a schedule immediately; pipeline errors propagate
    pub async fn run_now(&self, id: &str) -> SchedulerResult<ReportRecord> {
        self.engine.run_now(id).await
    }

    pub async fn query_history(&self, filter: &HistoryFilter) -> HistoryPage {
        self.history.query(filter).await
    }

    pub async fn get_report(&self, id: &str) -> Option<ReportRecord> {
        self.history.get(id).await
    }

    pub async fn delete_report(
        &self,
        id: &str,
        also_delete_artifact: bool,
    ) -> SchedulerResult<bool> {
        self.history.delete(id, also_delete_artifact).await
    }

    pub async fn tag_report(&self, id: &str, tags: &[String]) -> SchedulerResult<bool> {
        self.history.add_tags(id, tags).await
    }

    pub async fn untag_report(&self, id: &str, tags: &[String]) -> SchedulerResult<bool> {
        self.history.remove_tags(id, tags).await
    }

    pub async fn cleanup(&self, max_age_days: i64) -> SchedulerResult<usize> {
        self.history.cleanup_old_reports(max_age_days).await
    }

    pub async fn statistics(&self) -> HistoryStatistics {
        self.history.statistics().await
    }
}
