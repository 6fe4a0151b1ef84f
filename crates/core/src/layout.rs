//! Canonical output-key layout.
//!
//! The output key is a pure function of the job id. That is what makes the
//! idempotency check a single `exists` call with no extra bookkeeping.

use crate::id::JobId;

/// Where completed results live: `<prefix>/<jobId>/<object_name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    prefix: String,
    object_name: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::new("pitchdecks", "result.json")
    }
}

impl OutputLayout {
    pub fn new(prefix: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches('/').to_string(),
            object_name: object_name.into().trim_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn output_key(&self, job_id: JobId) -> String {
        if self.prefix.is_empty() {
            format!("{}/{}", job_id, self.object_name)
        } else {
            format!("{}/{}/{}", self.prefix, job_id, self.object_name)
        }
    }
}
