//! Pipeline orchestration for one report run

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::datasource::DataProvider;
use crate::errors::{DataSourceError, SchedulerResult};
use crate::models::{DataFormat, DataRow, ReportRecord, ReportRecordDraft, Schedule};
use crate::notifications::NotificationDispatcher;
use crate::pipeline::charts::shape_charts;
use crate::pipeline::hooks::PostRenderHook;
use crate::render::ReportRenderer;
use crate::storage::HistoryIndex;

/// Orchestrates one report generation run
///
/// The sequence is deterministic: load data, shape charts, render, run
/// post-render hooks, append history, notify. Either the run completes
/// through the history append and exactly one [`ReportRecord`] exists, or
/// it errors beforehand and no record is created. Runs are deliberately not
/// idempotent: every invocation produces a new, independent record.
pub struct ReportPipeline {
    provider: Arc<dyn DataProvider>,
    renderer: Arc<dyn ReportRenderer>,
    history: Arc<HistoryIndex>,
    dispatcher: Arc<NotificationDispatcher>,
    hooks: Vec<Arc<dyn PostRenderHook>>,
}

impl ReportPipeline {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        renderer: Arc<dyn ReportRenderer>,
        history: Arc<HistoryIndex>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            provider,
            renderer,
            history,
            dispatcher,
            hooks: Vec::new(),
        }
    }

    /// Append a best-effort post-render hook to the ordered hook list
    pub fn with_hook(mut self, hook: Arc<dyn PostRenderHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Execute one run for `schedule`
    pub async fn execute(&self, schedule: &Schedule) -> SchedulerResult<ReportRecord> {
        let config = &schedule.report_config;
        debug!(
            schedule_id = %schedule.id,
            report = %config.title,
            "Starting pipeline run"
        );

        // 1. Load the data source
        let rows = self.load_rows(config).await?;

        // 2. Shape charts; unknown kinds already skipped with a warning
        let charts = shape_charts(&config.charts, &rows);

        // 3. Render the artifact
        let artifact = self
            .renderer
            .generate_report(&charts, &config.title)
            .await?;

        // 4. Best-effort post-render hooks
        for hook in &self.hooks {
            if let Err(e) = hook.run(&artifact).await {
                warn!(
                    schedule_id = %schedule.id,
                    hook = hook.name(),
                    artifact = %artifact.display(),
                    "Post-render hook failed: {e}"
                );
            }
        }

        // 5. Exactly one history entry per completed run
        let record = self
            .history
            .add(ReportRecordDraft {
                title: config.title.clone(),
                path: artifact,
                schedule_id: Some(schedule.id.clone()),
                schedule_name: schedule.name.clone(),
                ..Default::default()
            })
            .await?;

        // 6. Best-effort notification
        if !schedule.recipients.is_empty() {
            self.dispatcher.send(&record, schedule).await;
        }

        info!(
            schedule_id = %schedule.id,
            record_id = %record.id,
            artifact = %record.path.display(),
            "Pipeline run completed"
        );
        Ok(record)
    }

    async fn load_rows(
        &self,
        config: &crate::models::ReportConfig,
    ) -> Result<Vec<DataRow>, DataSourceError> {
        let source = &config.data_source;
        let format =
            source
                .format
                .parse::<DataFormat>()
                .map_err(|_| DataSourceError::UnsupportedFormat {
                    format: source.format.clone(),
                })?;
        match format {
            DataFormat::Json => self.provider.load_from_json(&source.name).await,
            DataFormat::Csv => self.provider.load_from_csv(&source.name).await,
        }
    }
}
