//! Cron engine owning the live timer registry
//!
//! One tokio timer task per registered schedule id. The engine is an
//! explicitly constructed object owned by whichever layer starts it, never
//! a process-wide singleton, so multiple engines can coexist in tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{SchedulerError, SchedulerResult};
use crate::models::{ReportRecord, Schedule};
use crate::pipeline::ReportPipeline;
use crate::storage::ScheduleStore;
use crate::utils::cron_helper::{next_occurrence, parse_cron, parse_timezone};

/// Registration state of one schedule id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// No live timer
    Unregistered,
    /// Live timer armed, no run in flight
    Scheduled,
    /// A run for this id is currently executing
    Executing,
}

/// Counts over the engine's in-memory state
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    /// Schedule ids holding a live timer
    pub registered: usize,
    /// Schedule ids with a run currently in flight
    pub executing: usize,
}

struct TimerHandle {
    token: CancellationToken,
    // Distinguishes this timer from a replacement under the same id
    generation: u64,
}

/// Timer registry and trigger dispatcher
///
/// Invariant: at most one live timer per schedule id; re-registering
/// replaces the old timer (old-timer-stop happens-before new-timer-start,
/// both under the registry lock). A single failing run never deregisters
/// its schedule; only explicit calls change registration state.
pub struct CronEngine {
    store: Arc<ScheduleStore>,
    pipeline: Arc<ReportPipeline>,
    timers: Arc<Mutex<HashMap<String, TimerHandle>>>,
    generations: AtomicU64,
    running: Arc<RwLock<HashSet<String>>>,
}

impl CronEngine {
    pub fn new(store: Arc<ScheduleStore>, pipeline: Arc<ReportPipeline>) -> Self {
        Self {
            store,
            pipeline,
            timers: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
            running: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Load every persisted schedule and register the active ones with a
    /// parseable cron expression
    ///
    /// Malformed schedules are skipped with a warning; startup never aborts
    /// because one schedule is bad. A reconciliation pass then drops any
    /// live timer whose schedule is no longer persisted as active, so
    /// repeated calls converge on the persisted state.
    pub async fn start(&self) -> SchedulerResult<()> {
        let schedules = self.store.list().await?;
        let mut desired = HashSet::new();

        for schedule in schedules {
            if !schedule.active {
                debug!(schedule_id = %schedule.id, "Skipping inactive schedule");
                continue;
            }
            let id = schedule.id.clone();
            match self.register(schedule).await {
                Ok(()) => {
                    desired.insert(id);
                }
                Err(e) => warn!(schedule_id = %id, "Skipping malformed schedule: {e}"),
            }
        }

        let mut timers = self.timers.lock().await;
        let stale: Vec<String> = timers
            .keys()
            .filter(|id| !desired.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(handle) = timers.remove(&id) {
                handle.token.cancel();
                info!(schedule_id = %id, "Unregistered timer with no persisted active schedule");
            }
        }

        info!(registered = timers.len(), "Cron engine started");
        Ok(())
    }

    /// Validate and install a recurring timer for `schedule`
    ///
    /// Cron syntax and timezone are validated first (a validation error,
    /// distinct from storage errors); inactive schedules are rejected. An
    /// existing timer for the same id is stopped before the new one is
    /// installed.
    pub async fn register(&self, schedule: Schedule) -> SchedulerResult<()> {
        if !schedule.active {
            return Err(SchedulerError::validation(format!(
                "schedule '{}' is inactive and cannot be registered",
                schedule.id
            )));
        }
        let cron = parse_cron(&schedule.cron_expression)?;
        let tz = parse_timezone(&schedule.timezone)?;

        let token = CancellationToken::new();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let mut timers = self.timers.lock().await;
        if let Some(previous) = timers.remove(&schedule.id) {
            previous.token.cancel();
            debug!(schedule_id = %schedule.id, "Replacing existing timer");
        }

        let id = schedule.id.clone();
        info!(
            schedule_id = %id,
            cron = %schedule.cron_expression,
            timezone = %schedule.timezone,
            "Registered schedule"
        );
        timers.insert(
            id,
            TimerHandle {
                token: token.clone(),
                generation,
            },
        );
        tokio::spawn(timer_loop(
            schedule,
            cron,
            tz,
            token,
            generation,
            self.pipeline.clone(),
            self.timers.clone(),
            self.running.clone(),
        ));
        Ok(())
    }

    /// Stop and remove the timer for `id` if present
    ///
    /// Idempotent: unregistering an absent id is a no-op returning false.
    /// Never cancels an in-flight execution.
    pub async fn unregister(&self, id: &str) -> bool {
        let mut timers = self.timers.lock().await;
        match timers.remove(id) {
            Some(handle) => {
                handle.token.cancel();
                info!(schedule_id = %id, "Unregistered schedule");
                true
            }
            None => false,
        }
    }

    /// Execute the schedule's pipeline immediately, outside the cron cadence
    ///
    /// Unlike a cron trigger, pipeline errors propagate to the caller. The
    /// run registers itself in the in-flight guard so an overlapping cron
    /// trigger skips, but `run_now` itself is never skipped.
    pub async fn run_now(&self, id: &str) -> SchedulerResult<ReportRecord> {
        let schedule = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SchedulerError::not_found("schedule", id))?;

        let inserted = self.running.write().await.insert(schedule.id.clone());
        let result = self.pipeline.execute(&schedule).await;
        if inserted {
            self.running.write().await.remove(&schedule.id);
        }
        result
    }

    /// Current registration state of one schedule id
    pub async fn schedule_state(&self, id: &str) -> ScheduleState {
        if self.running.read().await.contains(id) {
            ScheduleState::Executing
        } else if self.timers.lock().await.contains_key(id) {
            ScheduleState::Scheduled
        } else {
            ScheduleState::Unregistered
        }
    }

    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            registered: self.timers.lock().await.len(),
            executing: self.running.read().await.len(),
        }
    }

    /// Cancel every timer; in-flight executions run to completion
    pub async fn shutdown(&self) {
        let mut timers = self.timers.lock().await;
        for (_, handle) in timers.drain() {
            handle.token.cancel();
        }
        info!("Cron engine shut down");
    }
}

/// One schedule's recurring timer
///
/// Sleeps to the next cron occurrence in the schedule's timezone, fires,
/// and re-arms immediately, so the cadence is fixed regardless of how long
/// an execution takes. A trigger landing while a previous run of the same
/// id is still executing is skipped, never queued. Each trigger runs as an
/// independent task and its error is logged, never allowed to take the
/// timer down. A loop that runs out of future occurrences removes its own
/// registry entry, unless a newer generation has replaced it.
#[allow(clippy::too_many_arguments)]
async fn timer_loop(
    schedule: Schedule,
    cron: CronSchedule,
    tz: Tz,
    token: CancellationToken,
    generation: u64,
    pipeline: Arc<ReportPipeline>,
    timers: Arc<Mutex<HashMap<String, TimerHandle>>>,
    running: Arc<RwLock<HashSet<String>>>,
) {
    loop {
        let Some(next) = next_occurrence(&cron, tz) else {
            warn!(
                schedule_id = %schedule.id,
                "Cron expression has no future occurrences, stopping timer"
            );
            let mut timers = timers.lock().await;
            if timers
                .get(&schedule.id)
                .is_some_and(|handle| handle.generation == generation)
            {
                timers.remove(&schedule.id);
            }
            break;
        };
        let delay = (next - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            _ = token.cancelled() => {
                debug!(schedule_id = %schedule.id, "Timer cancelled");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        if !running.write().await.insert(schedule.id.clone()) {
            warn!(
                schedule_id = %schedule.id,
                "Previous run still executing, skipping this trigger"
            );
            continue;
        }

        let schedule = schedule.clone();
        let pipeline = pipeline.clone();
        let running = running.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.execute(&schedule).await {
                warn!(schedule_id = %schedule.id, "Scheduled run failed: {e}");
            }
            running.write().await.remove(&schedule.id);
        });
    }
}
