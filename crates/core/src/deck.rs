//! Generated deck model: slides plus generation metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One slide as produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    pub title: String,
    pub content: String,
    /// Semantic tag (`title`, `problem`, `solution`, ...). Free-form.
    #[serde(rename = "type")]
    pub category: String,
}

/// Usage accounting for one model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub model: String,
    pub duration_ms: u64,
    pub generated_at: DateTime<Utc>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// The persisted result object of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub slides: Vec<SlideRecord>,
    pub metadata: GenerationMetadata,
}

/// The model's JSON did not have the slide shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeckShapeError {
    #[error("expected a JSON object at the root, got {0}")]
    RootNotObject(&'static str),
    #[error("`slides` must be an array, got {0}")]
    SlidesNotArray(&'static str),
    #[error("slide {index}: {reason}")]
    InvalidSlide { index: usize, reason: String },
}

/// Validate parsed model output against the slide shape.
///
/// A missing `slides` member yields an empty deck; any malformed slide
/// rejects the whole deck.
pub fn parse_slides(value: &Value) -> Result<Vec<SlideRecord>, DeckShapeError> {
    let root = value
        .as_object()
        .ok_or_else(|| DeckShapeError::RootNotObject(kind_of(value)))?;

    let slides = match root.get("slides") {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => return Err(DeckShapeError::SlidesNotArray(kind_of(other))),
    };

    slides
        .iter()
        .enumerate()
        .map(|(index, slide)| {
            let record: SlideRecord = serde_json::from_value(slide.clone()).map_err(|e| {
                DeckShapeError::InvalidSlide {
                    index,
                    reason: e.to_string(),
                }
            })?;
            if record.title.trim().is_empty() {
                return Err(DeckShapeError::InvalidSlide {
                    index,
                    reason: "title must not be empty".to_string(),
                });
            }
            Ok(record)
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
