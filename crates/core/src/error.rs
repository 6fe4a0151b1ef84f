//! Job error model.

use thiserror::Error;

/// Result type used across the job pipeline.
pub type JobResult<T> = Result<T, JobError>;

/// Terminal failure of a single job.
///
/// Every variant is fatal for the job that raised it: nothing inside the
/// pipeline retries. Callback delivery failures are not represented here;
/// they never change a job's outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The inbound request was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The input artifact does not exist.
    #[error("input object not found: {key}")]
    NotFound { key: String },

    /// Transport or auth failure against the artifact store.
    #[error("storage error: {0}")]
    Storage(String),

    /// The input is a recognized document type that cannot be extracted.
    #[error("unsupported input format '.{extension}': {message}")]
    UnsupportedFormat { extension: String, message: String },

    /// The input claimed to be text but did not decode.
    #[error("input {key} is not valid UTF-8: {detail}")]
    Encoding { key: String, detail: String },

    /// The model call failed or returned unusable content.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The invocation ran out of its time budget.
    #[error("invocation deadline exceeded while {stage}")]
    DeadlineExceeded { stage: String },
}

impl JobError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Whether the failure lies with the caller's request rather than with
    /// processing.
    pub fn is_client_error(&self) -> bool {
        match self {
            JobError::Validation(_) => true,
            JobError::NotFound { .. }
            | JobError::Storage(_)
            | JobError::UnsupportedFormat { .. }
            | JobError::Encoding { .. }
            | JobError::Generation(_)
            | JobError::DeadlineExceeded { .. } => false,
        }
    }
}

/// One offending field of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

/// Inbound request failed validation. Names every offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(fields: Vec<FieldError>) -> Self {
        Self { fields }
    }

    pub fn single(field: &'static str, reason: impl Into<String>) -> Self {
        Self::new(vec![FieldError {
            field,
            reason: reason.into(),
        }])
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }

    pub fn mentions(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} invalid field(s): ", self.fields.len())?;
        for (i, e) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// An identifier string that is not a UUID.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {reason}")]
pub struct InvalidId {
    pub kind: &'static str,
    pub reason: String,
}
