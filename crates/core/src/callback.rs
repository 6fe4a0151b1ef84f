//! Terminal-status notification sent to the caller's backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::JobId;

/// Terminal job status as reported to the backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackStatus {
    Completed,
    Failed,
}

impl CallbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackStatus::Completed => "COMPLETED",
            CallbackStatus::Failed => "FAILED",
        }
    }
}

impl core::fmt::Display for CallbackStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback body. Exactly one of `output_s3_key` / `error_message` is set,
/// matching `status`; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    job_id: JobId,
    status: CallbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_s3_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    generated_at: DateTime<Utc>,
}

impl CallbackPayload {
    pub fn completed(job_id: JobId, output_key: impl Into<String>) -> Self {
        Self {
            job_id,
            status: CallbackStatus::Completed,
            output_s3_key: Some(output_key.into()),
            error_message: None,
            generated_at: Utc::now(),
        }
    }

    pub fn failed(job_id: JobId, error_message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: CallbackStatus::Failed,
            output_s3_key: None,
            error_message: Some(error_message.into()),
            generated_at: Utc::now(),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn status(&self) -> CallbackStatus {
        self.status
    }

    pub fn output_s3_key(&self) -> Option<&str> {
        self.output_s3_key.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_payload_carries_only_output_key() {
        let job_id = JobId::new();
        let v = serde_json::to_value(CallbackPayload::completed(job_id, "out/x/result")).unwrap();

        assert_eq!(v["jobId"], job_id.to_string());
        assert_eq!(v["status"], "COMPLETED");
        assert_eq!(v["outputS3Key"], "out/x/result");
        assert!(v.get("errorMessage").is_none());
        assert!(v["generatedAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn failed_payload_carries_only_error() {
        let payload = CallbackPayload::failed(JobId::new(), "boom");
        let v = serde_json::to_value(&payload).unwrap();

        assert_eq!(v["status"], "FAILED");
        assert_eq!(v["errorMessage"], "boom");
        assert!(v.get("outputS3Key").is_none());
        assert_eq!(payload.status(), CallbackStatus::Failed);
    }
}
