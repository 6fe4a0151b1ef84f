//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: gateway construction from [`Settings`](deckgen_infra::Settings)
//! - `routes/`: HTTP handlers
//! - `errors.rs`: consistent JSON responses

use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router};

use deckgen_infra::{CallbackTransport, GenerationGateway, JobPipeline, StorageGateway};

pub mod errors;
pub mod routes;
pub mod services;

/// The pipeline as wired in production: every gateway behind a trait object.
pub type Pipeline =
    JobPipeline<Arc<dyn StorageGateway>, Arc<dyn GenerationGateway>, Arc<dyn CallbackTransport>>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Time budget of one invocation, measured from request arrival.
    pub deadline: Duration,
}

impl AppState {
    pub fn new(pipeline: Pipeline, deadline: Duration) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            deadline,
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    routes::router()
        .fallback(routes::system::not_found)
        .layer(Extension(state))
}
