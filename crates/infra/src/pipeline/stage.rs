//! Pipeline execution stages.

use std::sync::Mutex;

use tracing::info;

use deckgen_core::JobId;

/// Where a job is in the execution state machine.
///
/// `Start -> IdempotentHit` or
/// `Start -> Fetching -> Extracting -> Generating -> Persisting -> Notifying -> Done`;
/// any stage may end in `Failed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum JobStage {
    Start,
    IdempotentHit,
    Fetching,
    Extracting,
    Generating,
    Persisting,
    Notifying,
    Done,
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Start => "start",
            JobStage::IdempotentHit => "idempotent_hit",
            JobStage::Fetching => "fetching",
            JobStage::Extracting => "extracting",
            JobStage::Generating => "generating",
            JobStage::Persisting => "persisting",
            JobStage::Notifying => "notifying",
            JobStage::Done => "done",
            JobStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::IdempotentHit | JobStage::Done | JobStage::Failed)
    }
}

impl core::fmt::Display for JobStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the current stage so it survives a cancelled (timed-out) run.
#[derive(Debug)]
pub(crate) struct StageTracker {
    job_id: JobId,
    current: Mutex<JobStage>,
}

impl StageTracker {
    pub(crate) fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            current: Mutex::new(JobStage::Start),
        }
    }

    pub(crate) fn enter(&self, stage: JobStage) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = stage;
        info!(job_id = %self.job_id, stage = %stage, "pipeline stage");
    }

    pub(crate) fn current(&self) -> JobStage {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
