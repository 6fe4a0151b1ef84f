//! Job descriptor and inbound request validation.

use serde_json::{Map, Value};
use url::Url;

use crate::error::{FieldError, ValidationError};
use crate::id::{JobId, ProjectId, UserId};

/// Model used when the request does not name one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// A validated generation request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    job_id: JobId,
    project_id: ProjectId,
    user_id: UserId,
    input_key: String,
    callback_url: Url,
    model: String,
    system_prompt: Option<String>,
    user_prompt: Option<String>,
}

impl JobDescriptor {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Storage key of the input document.
    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    pub fn callback_url(&self) -> &Url {
        &self.callback_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn user_prompt(&self) -> Option<&str> {
        self.user_prompt.as_deref()
    }
}

/// Validate a raw inbound request into a [`JobDescriptor`].
///
/// All fields are checked before returning so the error names every
/// offending field at once. Empty prompt overrides are treated as absent.
pub fn validate_event(raw: &Value) -> Result<JobDescriptor, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError::single("$", "expected a JSON object"));
    };

    let mut errors = Vec::new();

    let job_id = required_id::<JobId>(obj, "jobId", &mut errors);
    let project_id = required_id::<ProjectId>(obj, "projectId", &mut errors);
    let user_id = required_id::<UserId>(obj, "userId", &mut errors);

    let input_key = match required_str(obj, "s3Key", &mut errors) {
        Some(k) if k.trim().is_empty() => {
            errors.push(field("s3Key", "must not be empty"));
            None
        }
        other => other.map(str::to_string),
    };

    let callback_url = required_str(obj, "callbackUrl", &mut errors).and_then(|raw| {
        match parse_callback_url(raw) {
            Ok(url) => Some(url),
            Err(reason) => {
                errors.push(field("callbackUrl", reason));
                None
            }
        }
    });

    let model = match optional_str(obj, "llmModel", &mut errors) {
        Some(m) if m.trim().is_empty() => {
            errors.push(field("llmModel", "must not be empty"));
            None
        }
        Some(m) => Some(m.to_string()),
        None => Some(DEFAULT_MODEL.to_string()),
    };

    let system_prompt = optional_str(obj, "systemPrompt", &mut errors)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let user_prompt = optional_str(obj, "userPrompt", &mut errors)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match (job_id, project_id, user_id, input_key, callback_url, model) {
        (Some(job_id), Some(project_id), Some(user_id), Some(input_key), Some(callback_url), Some(model))
            if errors.is_empty() =>
        {
            Ok(JobDescriptor {
                job_id,
                project_id,
                user_id,
                input_key,
                callback_url,
                model,
                system_prompt,
                user_prompt,
            })
        }
        _ => Err(ValidationError::new(errors)),
    }
}

fn field(name: &'static str, reason: impl Into<String>) -> FieldError {
    FieldError {
        field: name,
        reason: reason.into(),
    }
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    name: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match obj.get(name) {
        Some(Value::String(s)) => Some(s.as_str()),
        None | Some(Value::Null) => {
            errors.push(field(name, "field required"));
            None
        }
        Some(_) => {
            errors.push(field(name, "expected a string"));
            None
        }
    }
}

fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    name: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match obj.get(name) {
        Some(Value::String(s)) => Some(s.as_str()),
        None | Some(Value::Null) => None,
        Some(_) => {
            errors.push(field(name, "expected a string"));
            None
        }
    }
}

fn required_id<T>(obj: &Map<String, Value>, name: &'static str, errors: &mut Vec<FieldError>) -> Option<T>
where
    T: core::str::FromStr<Err = crate::error::InvalidId>,
{
    let raw = required_str(obj, name, errors)?;
    match raw.parse::<T>() {
        Ok(id) => Some(id),
        Err(e) => {
            errors.push(field(name, format!("not a valid UUID ({})", e.reason)));
            None
        }
    }
}

fn parse_callback_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported URL scheme '{other}'")),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_event() -> Value {
        json!({
            "jobId": "550e8400-e29b-41d4-a716-446655440000",
            "projectId": "660e8400-e29b-41d4-a716-446655440001",
            "userId": "770e8400-e29b-41d4-a716-446655440002",
            "s3Key": "uploads/user/project/business-plan.txt",
            "callbackUrl": "http://localhost:8080/api/v1/generate/callback"
        })
    }

    #[test]
    fn accepts_minimal_event_and_defaults_model() {
        let job = validate_event(&valid_event()).unwrap();

        assert_eq!(job.job_id().to_string(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(job.input_key(), "uploads/user/project/business-plan.txt");
        assert_eq!(job.callback_url().as_str(), "http://localhost:8080/api/v1/generate/callback");
        assert_eq!(job.model(), DEFAULT_MODEL);
        assert_eq!(job.system_prompt(), None);
        assert_eq!(job.user_prompt(), None);
    }

    #[test]
    fn keeps_prompt_overrides_verbatim() {
        let mut event = valid_event();
        event["llmModel"] = json!("claude-3-opus-20240229");
        event["systemPrompt"] = json!("  You are terse.  ");
        event["userPrompt"] = json!("Make it short.");

        let job = validate_event(&event).unwrap();
        assert_eq!(job.model(), "claude-3-opus-20240229");
        assert_eq!(job.system_prompt(), Some("  You are terse.  "));
        assert_eq!(job.user_prompt(), Some("Make it short."));
    }

    #[test]
    fn empty_prompt_overrides_count_as_absent() {
        let mut event = valid_event();
        event["systemPrompt"] = json!("");
        event["userPrompt"] = Value::Null;

        let job = validate_event(&event).unwrap();
        assert_eq!(job.system_prompt(), None);
        assert_eq!(job.user_prompt(), None);
    }

    #[test]
    fn reports_all_offending_fields() {
        let event = json!({
            "jobId": "nope",
            "projectId": "660e8400-e29b-41d4-a716-446655440001",
            "s3Key": "",
            "callbackUrl": "not a url",
            "llmModel": 42
        });

        let err = validate_event(&event).unwrap_err();
        for name in ["jobId", "userId", "s3Key", "callbackUrl", "llmModel"] {
            assert!(err.mentions(name), "expected {name} in {err}");
        }
        assert!(!err.mentions("projectId"));
    }

    #[test]
    fn rejects_non_http_callback() {
        let mut event = valid_event();
        event["callbackUrl"] = json!("ftp://example.com/callback");

        let err = validate_event(&event).unwrap_err();
        assert!(err.mentions("callbackUrl"));
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn rejects_non_object_payload() {
        let err = validate_event(&json!(["jobId"])).unwrap_err();
        assert!(err.mentions("$"));
    }
}
