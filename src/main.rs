use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use report_scheduler::{
    config::Config,
    datasource::FsDataProvider,
    engine::CronEngine,
    notifications::{LogTransport, NotificationDispatcher},
    pipeline::{
        hooks::{AccessibilityHook, ResponsivenessHook},
        ReportPipeline,
    },
    render::{HtmlReportRenderer, ReportRenderer},
    storage::{HistoryIndex, ScheduleStore},
};

#[derive(Parser)]
#[command(name = "report-scheduler")]
#[command(about = "Cron-driven report generation daemon")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Reports output directory (overrides config file)
    #[arg(long, value_name = "DIR")]
    reports_dir: Option<std::path::PathBuf>,

    /// Data source directory (overrides config file)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("report_scheduler={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting report scheduler v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(reports_dir) = cli.reports_dir {
        config.storage.reports_path = reports_dir;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_path = data_dir;
    }

    let store = Arc::new(ScheduleStore::new(config.storage.schedules_path.clone()).await?);
    let history = Arc::new(
        HistoryIndex::open(
            config.storage.history_path.clone(),
            config.storage.reports_path.clone(),
        )
        .await?,
    );
    let provider = Arc::new(FsDataProvider::new(config.storage.data_path.clone()));
    let renderer: Arc<dyn ReportRenderer> =
        Arc::new(HtmlReportRenderer::new(config.storage.reports_path.clone()).await?);

    let dispatcher = Arc::new(NotificationDispatcher::new(
        config.notifications.from_address.clone(),
        config.notifications.subject_prefix.clone(),
    ));
    if config.notifications.enabled {
        // No SMTP wiring in the daemon itself; the log transport records
        // what would have been delivered
        dispatcher.set_transport(Arc::new(LogTransport)).await;
        info!("Notifications enabled (log transport)");
    }

    let pipeline = Arc::new(
        ReportPipeline::new(provider, renderer.clone(), history.clone(), dispatcher)
            .with_hook(Arc::new(AccessibilityHook::new(renderer.clone())))
            .with_hook(Arc::new(ResponsivenessHook::new(renderer))),
    );

    let engine = Arc::new(CronEngine::new(store, pipeline));
    engine.start().await?;

    if config.retention.max_report_age_days > 0 {
        let cleanup_interval = humantime::parse_duration(&config.retention.cleanup_interval)?;
        let max_age_days = config.retention.max_report_age_days;
        let retention_history = history.clone();
        info!(
            max_age_days,
            "Starting retention loop, interval {}",
            config.retention.cleanup_interval
        );
        tokio::spawn(async move {
            let mut ticker = interval(cleanup_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the immediate first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match retention_history.cleanup_old_reports(max_age_days).await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Retention cleanup removed expired reports"),
                    Err(e) => error!("Retention cleanup failed: {e}"),
                }
            }
        });
    } else {
        info!("Retention cleanup disabled (max_report_age_days <= 0)");
    }

    info!("All services started, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    engine.shutdown().await;
    Ok(())
}
