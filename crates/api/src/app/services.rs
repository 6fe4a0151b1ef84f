//! Gateway construction. Everything here happens once per process.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use deckgen_infra::{
    AnthropicGateway, BedrockGateway, CallbackSender, CallbackTransport, GenerationGateway,
    HttpTransport, JobPipeline, S3Storage, Settings, StorageGateway,
};

use super::AppState;

pub async fn build_services(settings: &Settings) -> anyhow::Result<AppState> {
    let storage: Arc<dyn StorageGateway> = Arc::new(S3Storage::connect(&settings.storage).await);
    let generator: Arc<dyn GenerationGateway> = if settings.model.use_bedrock {
        Arc::new(BedrockGateway::connect(&settings.storage.region, settings.model.timeout).await)
    } else {
        Arc::new(AnthropicGateway::new(&settings.model).context("model gateway")?)
    };
    let transport: Arc<dyn CallbackTransport> =
        Arc::new(HttpTransport::new(settings.callback.timeout).context("callback transport")?);

    let pipeline = JobPipeline::new(
        storage,
        generator,
        CallbackSender::new(transport, settings.callback.retry.clone()),
        settings.pipeline(),
    );

    info!(
        bucket = %settings.storage.bucket,
        use_bedrock = settings.model.use_bedrock,
        deadline_secs = settings.deadline.as_secs(),
        "services initialized"
    );

    Ok(AppState::new(pipeline, settings.deadline))
}
