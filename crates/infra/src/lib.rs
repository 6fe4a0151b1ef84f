//! Infrastructure layer: storage and model gateways, callback delivery,
//! configuration, and the job pipeline that composes them.

pub mod callback;
pub mod config;
pub mod extract;
pub mod generation;
pub mod pipeline;
pub mod storage;

pub use callback::{CallbackError, CallbackSender, CallbackTransport, HttpTransport, RetryPolicy};
pub use config::{CallbackSettings, ConfigError, Settings};
pub use generation::{
    AnthropicGateway, BedrockGateway, GenerationError, GenerationGateway, GenerationRequest,
    ModelReply,
};
pub use pipeline::{InvocationResponse, JobOutcome, JobPipeline, JobStage, PipelineSettings};
pub use storage::{InMemoryStorage, ObjectTags, S3Storage, StorageError, StorageGateway};

mod integration_tests;
