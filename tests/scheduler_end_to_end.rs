//! End-to-end tests over the full scheduler system
//!
//! Wires real file-backed stores, the filesystem data provider, and the
//! HTML renderer in temp directories, driving everything through the
//! public facade.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use report_scheduler::{
    api::ReportSchedulerApi,
    datasource::FsDataProvider,
    engine::{CronEngine, ScheduleState},
    errors::{RenderError, SchedulerError},
    models::{
        ChartSpec, DataSourceSpec, HistoryFilter, ReportConfig, ScheduleCreateRequest,
        ScheduleUpdateRequest,
    },
    notifications::NotificationDispatcher,
    pipeline::{charts::ChartDefinition, ReportPipeline},
    render::{HtmlReportRenderer, ReportRenderer},
    storage::{HistoryIndex, ScheduleStore},
};

struct System {
    _dir: tempfile::TempDir,
    reports_root: PathBuf,
    engine: Arc<CronEngine>,
    api: ReportSchedulerApi,
}

async fn build_system(renderer: Option<Arc<dyn ReportRenderer>>) -> System {
    let dir = tempfile::TempDir::new().unwrap();
    let reports_root = dir.path().join("reports");

    let store = Arc::new(
        ScheduleStore::new(dir.path().join("schedules"))
            .await
            .unwrap(),
    );
    let history = Arc::new(
        HistoryIndex::open(dir.path().join("history"), reports_root.clone())
            .await
            .unwrap(),
    );

    tokio::fs::create_dir_all(dir.path().join("data"))
        .await
        .unwrap();
    tokio::fs::write(
        dir.path().join("data/sales.json"),
        r#"[
            {"region": "north", "amount": 10},
            {"region": "south", "amount": 5},
            {"region": "north", "amount": 3}
        ]"#,
    )
    .await
    .unwrap();
    let provider = Arc::new(FsDataProvider::new(dir.path().join("data")));

    let renderer: Arc<dyn ReportRenderer> = match renderer {
        Some(renderer) => renderer,
        None => Arc::new(HtmlReportRenderer::new(reports_root.clone()).await.unwrap()),
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(
        "reports@example.com".to_string(),
        String::new(),
    ));
    let pipeline = Arc::new(ReportPipeline::new(
        provider,
        renderer,
        history.clone(),
        dispatcher,
    ));
    let engine = Arc::new(CronEngine::new(store.clone(), pipeline));
    let api = ReportSchedulerApi::new(store, engine.clone(), history);

    System {
        _dir: dir,
        reports_root,
        engine,
        api,
    }
}

fn daily_request(id: &str) -> ScheduleCreateRequest {
    ScheduleCreateRequest {
        id: Some(id.to_string()),
        name: "Daily sales".to_string(),
        cron_expression: "0 9 * * *".to_string(),
        timezone: "UTC".to_string(),
        report_config: ReportConfig {
            title: "Daily".to_string(),
            charts: vec![ChartSpec {
                title: "Sales by region".to_string(),
                chart_type: "bar".to_string(),
                label_field: Some("region".to_string()),
                value_field: Some("amount".to_string()),
                columns: vec![],
            }],
            data_source: DataSourceSpec {
                name: "sales".to_string(),
                format: "json".to_string(),
            },
        },
        recipients: vec![],
        active: true,
    }
}

struct ExplodingRenderer;

#[async_trait]
impl ReportRenderer for ExplodingRenderer {
    async fn generate_report(
        &self,
        _charts: &[ChartDefinition],
        _report_name: &str,
    ) -> Result<PathBuf, RenderError> {
        Err(RenderError::Failed {
            message: "renderer exploded".to_string(),
        })
    }

    async fn test_report_accessibility(&self, _artifact: &Path) -> Result<(), RenderError> {
        Ok(())
    }

    async fn test_report_responsiveness(&self, _artifact: &Path) -> Result<(), RenderError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_create_run_query_cleanup_delete_scenario() {
    let system = build_system(None).await;

    let schedule = system.api.create_schedule(daily_request("S1")).await.unwrap();
    assert_eq!(schedule.id, "S1");
    assert_eq!(
        system.engine.schedule_state("S1").await,
        ScheduleState::Scheduled
    );

    // Manual trigger runs the full pipeline synchronously
    let record = system.api.run_now("S1").await.unwrap();
    assert_eq!(record.title, "Daily");

    let page = system
        .api
        .query_history(&HistoryFilter {
            schedule_id: Some("S1".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].title, "Daily");

    let artifact = system.reports_root.join(&page.records[0].path);
    assert!(artifact.exists());
    let html = tokio::fs::read_to_string(&artifact).await.unwrap();
    assert!(html.contains("Sales by region"));
    // Grouped and summed: north = 13
    assert!(html.contains("<td>north</td><td>13</td>"));

    // cleanup(0) is disabled retention and removes nothing
    assert_eq!(system.api.cleanup(0).await.unwrap(), 0);
    assert_eq!(system.api.query_history(&HistoryFilter::default()).await.total, 1);

    // Deleting with the artifact flag removes both entry and file
    assert!(system.api.delete_report(&record.id, true).await.unwrap());
    assert_eq!(system.api.query_history(&HistoryFilter::default()).await.total, 0);
    assert!(!artifact.exists());
}

#[tokio::test]
async fn test_renderer_failure_leaves_history_untouched() {
    let system = build_system(Some(Arc::new(ExplodingRenderer))).await;
    system.api.create_schedule(daily_request("S1")).await.unwrap();

    let result = system.api.run_now("S1").await;
    assert!(matches!(result, Err(SchedulerError::Render(_))));

    // No orphan or partial history entry
    assert_eq!(system.api.query_history(&HistoryFilter::default()).await.total, 0);
    // The schedule stays registered; one failing run never deregisters it
    assert_eq!(
        system.engine.schedule_state("S1").await,
        ScheduleState::Scheduled
    );
}

#[tokio::test]
async fn test_create_with_bad_cron_persists_dormant() {
    let system = build_system(None).await;
    let mut request = daily_request("S1");
    request.cron_expression = "not a cron".to_string();

    // Creation succeeds; registration is skipped with a warning
    let schedule = system.api.create_schedule(request).await.unwrap();
    assert_eq!(schedule.cron_expression, "not a cron");
    assert_eq!(
        system.engine.schedule_state("S1").await,
        ScheduleState::Unregistered
    );
    assert!(system.api.get_schedule("S1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_update_couples_registration_to_active_flag() {
    let system = build_system(None).await;
    system.api.create_schedule(daily_request("S1")).await.unwrap();

    system
        .api
        .update_schedule(
            "S1",
            ScheduleUpdateRequest {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        system.engine.schedule_state("S1").await,
        ScheduleState::Unregistered
    );

    system
        .api
        .update_schedule(
            "S1",
            ScheduleUpdateRequest {
                active: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        system.engine.schedule_state("S1").await,
        ScheduleState::Scheduled
    );

    // Updating to a bad cron expression unregisters rather than keeping a
    // stale timer
    system
        .api
        .update_schedule(
            "S1",
            ScheduleUpdateRequest {
                cron_expression: Some("bogus".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        system.engine.schedule_state("S1").await,
        ScheduleState::Unregistered
    );
}

#[tokio::test]
async fn test_delete_schedule_stops_timer_and_keeps_history() {
    let system = build_system(None).await;
    system.api.create_schedule(daily_request("S1")).await.unwrap();
    let record = system.api.run_now("S1").await.unwrap();

    assert!(system.api.delete_schedule("S1").await.unwrap());
    assert_eq!(
        system.engine.schedule_state("S1").await,
        ScheduleState::Unregistered
    );
    assert!(system.api.get_schedule("S1").await.unwrap().is_none());

    // History outlives the schedule
    assert!(system.api.get_report(&record.id).await.is_some());

    // Deleting again is a no-op result
    assert!(!system.api.delete_schedule("S1").await.unwrap());
}

#[tokio::test]
async fn test_cron_trigger_fires_and_records_history() {
    let system = build_system(None).await;
    let mut request = daily_request("S1");
    // Every second, 6-field form
    request.cron_expression = "* * * * * *".to_string();
    system.api.create_schedule(request).await.unwrap();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let page = system.api.query_history(&HistoryFilter::default()).await;
        if page.total >= 1 {
            assert_eq!(page.records[0].schedule_id.as_deref(), Some("S1"));
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "cron trigger never fired"
        );
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    system.engine.shutdown().await;
}

#[tokio::test]
async fn test_statistics_reflect_manual_runs() {
    let system = build_system(None).await;
    system.api.create_schedule(daily_request("S1")).await.unwrap();
    system.api.run_now("S1").await.unwrap();
    system.api.run_now("S1").await.unwrap();

    let stats = system.api.statistics().await;
    assert_eq!(stats.total_reports, 2);
    assert_eq!(stats.by_schedule.get("Daily sales"), Some(&2));
    assert!(stats.newest >= stats.oldest);

    let mut page = system.api.query_history(&HistoryFilter::default()).await;
    let record = page.records.remove(0);
    assert!(system
        .api
        .tag_report(&record.id, &["reviewed".to_string()])
        .await
        .unwrap());
    let tagged = system.api.get_report(&record.id).await.unwrap();
    assert!(tagged.tags.contains("reviewed"));
}
