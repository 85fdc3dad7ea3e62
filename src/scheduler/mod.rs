//! Recurring lifecycle jobs.
//!
//! Each [`JobKind`] runs on its own timer. A tick that arrives while the
//! previous run of the same job is still active is skipped, and a job that
//! fails or panics is recorded in its [`JobSnapshot`] without affecting the
//! other jobs.

use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerSettings;
use crate::data_fetcher::cache::CacheStats;
use crate::error::AppError;
use crate::performance::MetricsSnapshot;

pub mod job_state;
pub mod jobs;

pub use job_state::{JobSnapshot, JobState, JobStatus};
pub use jobs::{JobContext, JobOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Discovery,
    Lineups,
    Live,
    PostMatch,
}

impl JobKind {
    /// All jobs in dependency order.
    pub fn all() -> [JobKind; 4] {
        [
            JobKind::Discovery,
            JobKind::Lineups,
            JobKind::Live,
            JobKind::PostMatch,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            JobKind::Discovery => "discovery",
            JobKind::Lineups => "lineups",
            JobKind::Live => "live",
            JobKind::PostMatch => "post-match",
        }
    }

    pub fn interval(self, settings: &SchedulerSettings) -> Duration {
        let seconds = match self {
            JobKind::Discovery => settings.discovery_interval_seconds,
            JobKind::Lineups => settings.lineup_interval_seconds,
            JobKind::Live => settings.live_interval_seconds,
            JobKind::PostMatch => settings.post_match_interval_seconds,
        };
        Duration::from_secs(seconds.max(1))
    }

    fn index(self) -> usize {
        match self {
            JobKind::Discovery => 0,
            JobKind::Lineups => 1,
            JobKind::Live => 2,
            JobKind::PostMatch => 3,
        }
    }
}

/// Job states plus request metrics and cache counts, for health checks.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerReport {
    pub jobs: Vec<JobSnapshot>,
    pub metrics: MetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

struct SchedulerInner {
    ctx: JobContext,
    jobs: [JobState; 4],
}

impl SchedulerInner {
    fn state(&self, kind: JobKind) -> &JobState {
        &self.jobs[kind.index()]
    }

    /// Runs `kind` once unless it is already running. `Ok(None)` means skipped.
    async fn run_job(&self, kind: JobKind) -> Result<Option<JobOutcome>, AppError> {
        let state = self.state(kind);
        let now = chrono::Utc::now();
        let Some(_guard) = state.try_begin(now) else {
            debug!("Skipping {} run, previous run still active", kind.name());
            return Ok(None);
        };

        debug!("Starting {} run", kind.name());
        let started = std::time::Instant::now();
        match AssertUnwindSafe(self.dispatch(kind, now)).catch_unwind().await {
            Ok(Ok(outcome)) => {
                debug!("{} run finished in {:?}", kind.name(), started.elapsed());
                state.finish_success(outcome);
                Ok(Some(outcome))
            }
            Ok(Err(e)) => {
                error!("{} run failed: {}", kind.name(), e);
                state.finish_error(e.to_string());
                Err(e)
            }
            Err(panic) => {
                let message = format!("{} run panicked: {}", kind.name(), panic_message(&*panic));
                error!("{}", message);
                state.finish_error(message.clone());
                Err(AppError::Custom(message))
            }
        }
    }

    async fn dispatch(&self, kind: JobKind, now: chrono::DateTime<chrono::Utc>) -> Result<JobOutcome, AppError> {
        match kind {
            JobKind::Discovery => jobs::discovery::run(&self.ctx, now).await,
            JobKind::Lineups => jobs::lineups::run(&self.ctx, now).await,
            JobKind::Live => jobs::live::run(&self.ctx, now).await,
            JobKind::PostMatch => jobs::post_match::run(&self.ctx, now).await,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Owns the job timers. Lifecycle: [`new`](Self::new), [`start`](Self::start),
/// [`stop`](Self::stop); one-shot runs work without starting.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(ctx: JobContext) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(SchedulerInner {
                ctx,
                jobs: JobKind::all().map(JobState::new),
            }),
            handles: Mutex::new(Vec::new()),
            shutdown,
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawns one timer loop per job. Each timer fires immediately, then at
    /// the job's interval. Calling `start` on a started scheduler does nothing.
    pub fn start(&self) {
        let mut handles = self.lock_handles();
        if !handles.is_empty() {
            warn!("Scheduler already started");
            return;
        }
        self.shutdown.send_replace(false);

        for kind in JobKind::all() {
            let period = kind.interval(&self.inner.ctx.settings);
            let inner = Arc::clone(&self.inner);
            let mut shutdown = self.shutdown.subscribe();
            info!("Scheduling {} every {:?}", kind.name(), period);

            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            // Failures are recorded in the job state
                            let _ = inner.run_job(kind).await;
                        }
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
                debug!("{} timer stopped", kind.name());
            }));
        }
    }

    /// Signals every timer loop and waits for them to exit. A run in
    /// progress finishes first.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        let handles: Vec<JoinHandle<()>> = self.lock_handles().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Job loop ended abnormally: {}", e);
            }
        }
        info!("Scheduler stopped");
    }

    pub fn is_started(&self) -> bool {
        !self.lock_handles().is_empty()
    }

    pub fn status(&self) -> Vec<JobSnapshot> {
        self.inner.jobs.iter().map(JobState::snapshot).collect()
    }

    pub async fn report(&self) -> SchedulerReport {
        let cache = match self.inner.ctx.client.cache().stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Could not read cache stats: {}", e);
                None
            }
        };
        SchedulerReport {
            jobs: self.status(),
            metrics: self.inner.ctx.client.metrics(),
            cache,
        }
    }

    /// Runs one job now. Returns `Ok(None)` when it is already running.
    pub async fn run_job_once(&self, kind: JobKind) -> Result<Option<JobOutcome>, AppError> {
        self.inner.run_job(kind).await
    }

    /// Runs every job once in dependency order, then reports.
    pub async fn run_all_once(&self) -> SchedulerReport {
        for kind in JobKind::all() {
            if let Err(e) = self.inner.run_job(kind).await {
                warn!("{} failed during one-shot run: {}", kind.name(), e);
            }
        }
        self.report().await
    }
}
