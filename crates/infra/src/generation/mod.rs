//! Generative-model gateway.
//!
//! The gateway is a plain request/response capability: prompts in, text and
//! token usage out. Prompt construction lives in [`prompts`], and turning the
//! returned text into slide JSON lives in [`response`].

pub mod anthropic;
pub mod bedrock;
pub mod prompts;
pub mod response;

use std::sync::Arc;

use async_trait::async_trait;

use deckgen_core::JobError;

pub use anthropic::{AnthropicGateway, ModelSettings};
pub use bedrock::{BedrockGateway, bedrock_model_id};

/// One model call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// What the model returned, with usage accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    /// Model identifier to record in result metadata.
    pub model: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Generation gateway error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("model client misconfigured: {0}")]
    Configuration(String),
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected model response: {0}")]
    InvalidResponse(String),
    #[error("invalid JSON in model response: {0}")]
    MalformedJson(String),
    #[error("model response has the wrong shape: {0}")]
    InvalidShape(String),
}

impl From<GenerationError> for JobError {
    fn from(err: GenerationError) -> Self {
        JobError::generation(err.to_string())
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Transport(format!("timed out: {}", err))
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

/// Synchronous request/response call to a generative model.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError>;
}

#[async_trait]
impl<G> GenerationGateway for Arc<G>
where
    G: GenerationGateway + ?Sized,
{
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError> {
        (**self).generate(request).await
    }
}
