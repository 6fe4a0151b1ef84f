//! Job outcomes and the structured response returned to the invoker.

use serde::Serialize;

use deckgen_core::{CallbackStatus, JobError, JobId};

use super::stage::JobStage;

/// Prefix of every processing failure message.
pub const PROCESSING_FAILED: &str = "Pitch deck generation failed: ";
/// Prefix of every validation failure message.
pub const VALIDATION_FAILED: &str = "Event validation failed: ";

/// Result of running one job through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub status: CallbackStatus,
    /// Terminal stage: `Done`, `IdempotentHit` or `Failed`.
    pub stage: JobStage,
    /// Stage that was running when the job failed.
    pub failed_stage: Option<JobStage>,
    pub output_key: Option<String>,
    pub error: Option<JobError>,
    /// Human-readable failure message, as sent in the callback.
    pub message: Option<String>,
    pub idempotent: bool,
    pub callback_sent: bool,
    pub duration_ms: u64,
    pub slides_count: Option<usize>,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == CallbackStatus::Completed
    }
}

/// Response body returned to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationBody {
    pub status: CallbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_s3_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// HTTP-style status plus body: 200 success, 400 validation, 500 processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: InvocationBody,
}

impl InvocationResponse {
    pub fn validation_failed(message: String) -> Self {
        Self {
            status_code: 400,
            body: InvocationBody {
                status: CallbackStatus::Failed,
                job_id: None,
                output_s3_key: None,
                callback_sent: None,
                idempotent: None,
                duration_ms: None,
                slides_count: None,
                error: Some(message),
            },
        }
    }

    pub fn from_outcome(outcome: &JobOutcome) -> Self {
        match outcome.status {
            CallbackStatus::Completed => Self {
                status_code: 200,
                body: InvocationBody {
                    status: CallbackStatus::Completed,
                    job_id: Some(outcome.job_id),
                    output_s3_key: outcome.output_key.clone(),
                    callback_sent: Some(outcome.callback_sent),
                    idempotent: Some(outcome.idempotent),
                    duration_ms: Some(outcome.duration_ms),
                    slides_count: outcome.slides_count,
                    error: None,
                },
            },
            CallbackStatus::Failed => Self {
                status_code: if outcome.error.as_ref().is_some_and(JobError::is_client_error) {
                    400
                } else {
                    500
                },
                body: InvocationBody {
                    status: CallbackStatus::Failed,
                    job_id: Some(outcome.job_id),
                    output_s3_key: None,
                    callback_sent: Some(outcome.callback_sent),
                    idempotent: None,
                    duration_ms: Some(outcome.duration_ms),
                    slides_count: None,
                    error: outcome.message.clone(),
                },
            },
        }
    }
}
