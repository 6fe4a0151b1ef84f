//! AWS Bedrock gateway for Anthropic models.
//!
//! Bedrock speaks the Messages body minus the `model` member: the model is
//! addressed by its Bedrock id and the API version travels in the body.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::Client as BedrockClient;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use serde::Serialize;
use tracing::{debug, error, info};

use super::anthropic::{Message, MessagesResponse};
use super::{GenerationError, GenerationGateway, GenerationRequest, ModelReply};

const BEDROCK_API_VERSION: &str = "bedrock-2023-05-31";

/// Used for any model name without a known Bedrock counterpart.
pub const DEFAULT_BEDROCK_MODEL: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";

/// Bedrock model id for an Anthropic API model name.
pub fn bedrock_model_id(model: &str) -> &'static str {
    match model {
        "claude-sonnet-4-20250514" | "claude-3-5-sonnet-20241022" => {
            "anthropic.claude-3-5-sonnet-20241022-v2:0"
        }
        "claude-3-opus-20240229" => "anthropic.claude-3-opus-20240229-v1:0",
        _ => DEFAULT_BEDROCK_MODEL,
    }
}

#[derive(Debug, Serialize)]
struct InvokeBody<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

impl<'a> InvokeBody<'a> {
    fn new(request: &'a GenerationRequest) -> Self {
        Self {
            anthropic_version: BEDROCK_API_VERSION,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system_prompt,
            messages: [Message::user(&request.user_prompt)],
        }
    }
}

/// Calls `InvokeModel` on the Bedrock runtime.
#[derive(Debug, Clone)]
pub struct BedrockGateway {
    client: BedrockClient,
}

impl BedrockGateway {
    /// Build a client from the default AWS credential chain.
    pub async fn connect(region: &str, timeout: Duration) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .load()
            .await;

        info!(region = %region, "Bedrock gateway initialized");

        Self::from_client(BedrockClient::new(&shared))
    }

    pub fn from_client(client: BedrockClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GenerationGateway for BedrockGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError> {
        let model_id = bedrock_model_id(&request.model);
        info!(
            model = %request.model,
            model_id,
            max_tokens = request.max_tokens,
            "calling Bedrock"
        );

        let body = serde_json::to_vec(&InvokeBody::new(request))
            .map_err(|e| GenerationError::Configuration(format!("request body: {}", e)))?;

        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                error!(model_id, error = %DisplayErrorContext(&e), "Bedrock invocation failed");
                match e.raw_response().map(|r| r.status().as_u16()) {
                    Some(status) => GenerationError::Api {
                        status,
                        message: DisplayErrorContext(&e).to_string(),
                    },
                    None => GenerationError::Transport(DisplayErrorContext(&e).to_string()),
                }
            })?;

        let reply = parse_reply(output.body().as_ref(), model_id)?;

        debug!(
            chars = reply.text.len(),
            input_tokens = ?reply.input_tokens,
            output_tokens = ?reply.output_tokens,
            "Bedrock call completed"
        );

        Ok(reply)
    }
}

/// The recorded model is always the Bedrock id that was invoked.
fn parse_reply(body: &[u8], model_id: &str) -> Result<ModelReply, GenerationError> {
    let parsed: MessagesResponse = serde_json::from_slice(body)
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
    parsed.into_reply(model_id.to_string())
}
