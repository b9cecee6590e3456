//! Progress reporting and job bookkeeping. The pipeline only sees the
//! `ProgressSink` trait; storage and expiry belong to whoever hosts it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How long finished or abandoned job entries are kept.
pub const JOB_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    Initializing,
    Audio,
    Frames,
    Video,
    Finalizing,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Initializing => "initializing",
            Step::Audio => "audio",
            Step::Frames => "frames",
            Step::Video => "video",
            Step::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives pipeline checkpoints. Implementations must accept concurrent
/// calls for different job ids.
pub trait ProgressSink: Send + Sync {
    fn update(&self, job_id: &str, step: Step, percent: u8);
    fn mark_completed(&self, job_id: &str);
    fn mark_failed(&self, job_id: &str, message: &str);
}

#[derive(Clone, Debug, PartialEq)]
pub enum JobState {
    Processing,
    Completed,
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct JobStatus {
    pub step: Step,
    pub progress: u8,
    pub state: JobState,
    pub updated_at: Instant,
}

impl JobStatus {
    pub fn processing(step: Step, progress: u8) -> Self {
        Self {
            step,
            progress,
            state: JobState::Processing,
            updated_at: Instant::now(),
        }
    }
}

pub trait JobStore: Send + Sync {
    fn put(&self, job_id: &str, status: JobStatus);
    fn get(&self, job_id: &str) -> Option<JobStatus>;
    fn delete(&self, job_id: &str) -> Option<JobStatus>;
    /// Drop entries not updated within `ttl`; returns how many were removed.
    fn sweep_expired(&self, ttl: Duration) -> usize;
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, JobStatus>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_jobs<R>(&self, f: impl FnOnce(&mut HashMap<String, JobStatus>) -> R) -> R {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut jobs)
    }

    fn modify(&self, job_id: &str, f: impl FnOnce(&mut JobStatus)) {
        self.with_jobs(|jobs| {
            let status = jobs
                .entry(job_id.to_string())
                .or_insert_with(|| JobStatus::processing(Step::Initializing, 0));
            f(status);
            status.updated_at = Instant::now();
        });
    }
}

impl JobStore for MemoryJobStore {
    fn put(&self, job_id: &str, status: JobStatus) {
        self.with_jobs(|jobs| jobs.insert(job_id.to_string(), status));
    }

    fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.with_jobs(|jobs| jobs.get(job_id).cloned())
    }

    fn delete(&self, job_id: &str) -> Option<JobStatus> {
        self.with_jobs(|jobs| jobs.remove(job_id))
    }

    fn sweep_expired(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        self.with_jobs(|jobs| {
            let before = jobs.len();
            jobs.retain(|_, status| now.duration_since(status.updated_at) < ttl);
            before - jobs.len()
        })
    }
}

impl ProgressSink for MemoryJobStore {
    fn update(&self, job_id: &str, step: Step, percent: u8) {
        log::debug!("Job {}: {} - {}%", job_id, step, percent);
        self.modify(job_id, |status| {
            status.step = step;
            status.progress = percent.min(100);
        });
    }

    fn mark_completed(&self, job_id: &str) {
        self.modify(job_id, |status| {
            status.progress = 100;
            status.state = JobState::Completed;
        });
    }

    fn mark_failed(&self, job_id: &str, message: &str) {
        self.modify(job_id, |status| status.state = JobState::Failed(message.to_string()));
    }
}

/// Sink that only logs.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn update(&self, job_id: &str, step: Step, percent: u8) {
        log::info!("Job {}: {} - {}%", job_id, step, percent);
    }

    fn mark_completed(&self, job_id: &str) {
        log::info!("Job {} completed", job_id);
    }

    fn mark_failed(&self, job_id: &str, message: &str) {
        log::error!("Job {} failed: {}", job_id, message);
    }
}
