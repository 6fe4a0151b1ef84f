//! Extract the slide JSON object from model output text.
//!
//! Models often wrap JSON in a markdown fence. Only a leading and a trailing
//! fence are stripped; anything else must already be valid JSON.

use serde_json::Value;

use super::GenerationError;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Strip a leading ```` ```json ```` / ```` ``` ```` and a trailing ```` ``` ````.
pub fn strip_fences(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix(JSON_FENCE) {
        body = rest;
    } else if let Some(rest) = body.strip_prefix(FENCE) {
        body = rest;
    }

    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest;
    }

    body.trim()
}

/// Parse the model's JSON payload. Never returns partial data.
pub fn extract_json(text: &str) -> Result<Value, GenerationError> {
    let body = strip_fences(text);
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        tracing::debug!(preview = %preview, "unparseable model output");
        GenerationError::MalformedJson(e.to_string())
    })
}
