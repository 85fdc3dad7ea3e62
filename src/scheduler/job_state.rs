use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::JobKind;
use super::jobs::JobOutcome;

/// Result of the most recent run of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Success,
    Error,
}

#[derive(Debug, Clone)]
struct JobRecord {
    last_run: Option<DateTime<Utc>>,
    status: JobStatus,
    consecutive_errors: u32,
    total_runs: u64,
    skipped_ticks: u64,
    last_error: Option<String>,
    last_outcome: Option<JobOutcome>,
}

/// Point-in-time view of a job, as returned by the status query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub job: &'static str,
    pub last_run: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub consecutive_errors: u32,
    pub total_runs: u64,
    pub skipped_ticks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<JobOutcome>,
}

/// Running flag and bookkeeping for one job.
///
/// At most one run of a job is active at a time: [`JobState::try_begin`]
/// hands out a [`RunGuard`] only when no other run holds one.
#[derive(Debug)]
pub struct JobState {
    kind: JobKind,
    running: AtomicBool,
    record: Mutex<JobRecord>,
}

/// Clears the running flag when the run ends, panics included.
#[derive(Debug)]
pub struct RunGuard<'a> {
    state: &'a JobState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}

impl JobState {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            running: AtomicBool::new(false),
            record: Mutex::new(JobRecord {
                last_run: None,
                status: JobStatus::Idle,
                consecutive_errors: 0,
                total_runs: 0,
                skipped_ticks: 0,
                last_error: None,
                last_outcome: None,
            }),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JobRecord> {
        self.record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Marks the job running and stamps `last_run`. Returns `None` and
    /// counts a skipped tick when a previous run is still active.
    pub fn try_begin(&self, now: DateTime<Utc>) -> Option<RunGuard<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.lock().skipped_ticks += 1;
            return None;
        }

        let mut record = self.lock();
        record.status = JobStatus::Running;
        record.last_run = Some(now);
        record.total_runs += 1;
        Some(RunGuard { state: self })
    }

    pub fn finish_success(&self, outcome: JobOutcome) {
        let mut record = self.lock();
        record.status = JobStatus::Success;
        record.consecutive_errors = 0;
        record.last_error = None;
        record.last_outcome = Some(outcome);
    }

    pub fn finish_error(&self, message: impl Into<String>) {
        let mut record = self.lock();
        record.status = JobStatus::Error;
        record.consecutive_errors += 1;
        record.last_error = Some(message.into());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let record = self.lock().clone();
        JobSnapshot {
            job: self.kind.name(),
            last_run: record.last_run,
            status: record.status,
            consecutive_errors: record.consecutive_errors,
            total_runs: record.total_runs,
            skipped_ticks: record.skipped_ticks,
            last_error: record.last_error,
            last_outcome: record.last_outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_skipped_while_running() {
        let state = JobState::new(JobKind::Live);
        let now = Utc::now();

        let guard = state.try_begin(now);
        assert!(guard.is_some());
        assert!(state.is_running());
        assert!(state.try_begin(now).is_none());

        drop(guard);
        assert!(!state.is_running());
        assert!(state.try_begin(now).is_some());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.skipped_ticks, 1);
        assert_eq!(snapshot.total_runs, 2);
    }

    #[test]
    fn test_error_counter_resets_on_success() {
        let state = JobState::new(JobKind::Discovery);

        for _ in 0..3 {
            let _guard = state.try_begin(Utc::now());
            state.finish_error("store unavailable");
        }
        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert_eq!(snapshot.consecutive_errors, 3);
        assert_eq!(snapshot.last_error.as_deref(), Some("store unavailable"));

        state.finish_success(JobOutcome::default());
        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, JobStatus::Success);
        assert_eq!(snapshot.consecutive_errors, 0);
        assert!(snapshot.last_error.is_none());
    }

    #[test]
    fn test_fresh_state_is_idle() {
        let snapshot = JobState::new(JobKind::PostMatch).snapshot();
        assert_eq!(snapshot.job, "post-match");
        assert_eq!(snapshot.status, JobStatus::Idle);
        assert!(snapshot.last_run.is_none());
    }
}
