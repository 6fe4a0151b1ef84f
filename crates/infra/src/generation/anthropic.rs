//! Anthropic Messages API gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{GenerationError, GenerationGateway, GenerationRequest, ModelReply};

const API_VERSION: &str = "2023-06-01";

/// Connection and sampling settings for the model API.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    /// Call the model through AWS Bedrock instead of the Anthropic API.
    pub use_bedrock: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8000,
            temperature: 0.7,
            timeout: Duration::from_secs(300),
            use_bedrock: false,
        }
    }
}

/// Calls `POST {base_url}/v1/messages`.
#[derive(Debug, Clone)]
pub struct AnthropicGateway {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicGateway {
    pub fn new(settings: &ModelSettings) -> Result<Self, GenerationError> {
        if settings.api_key.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "ANTHROPIC_API_KEY is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GenerationError::Configuration(format!("HTTP client: {}", e)))?;

        info!(base_url = %settings.base_url, "Anthropic gateway initialized");

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(super) struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> Message<'a> {
    pub(super) fn user(content: &'a str) -> Self {
        Self { role: "user", content }
    }
}

/// Messages response body; Bedrock returns the same shape.
#[derive(Debug, Deserialize)]
pub(super) struct MessagesResponse {
    /// Model that actually served the request.
    pub model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

impl MessagesResponse {
    /// First text block plus usage, recorded under `model`.
    pub(super) fn into_reply(self, model: String) -> Result<ModelReply, GenerationError> {
        let text = self
            .content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text)
            .ok_or_else(|| GenerationError::InvalidResponse("no text content block".to_string()))?;

        let (input_tokens, output_tokens) = self
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((None, None));

        Ok(ModelReply {
            text,
            model,
            input_tokens,
            output_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl GenerationGateway for AnthropicGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError> {
        info!(model = %request.model, max_tokens = request.max_tokens, "calling Anthropic API");

        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system_prompt,
            messages: [Message::user(&request.user_prompt)],
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| text.chars().take(500).collect());
            error!(status = status.as_u16(), message = %message, "Anthropic API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let model = parsed.model.clone().unwrap_or_else(|| request.model.clone());
        let reply = parsed.into_reply(model)?;

        debug!(
            chars = reply.text.len(),
            input_tokens = ?reply.input_tokens,
            output_tokens = ?reply.output_tokens,
            "Anthropic API call completed"
        );

        Ok(reply)
    }
}
