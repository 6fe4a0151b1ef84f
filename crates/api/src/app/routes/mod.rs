use axum::{
    Router,
    routing::{get, post},
};

pub mod invoke;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/invoke", post(invoke::invoke))
        .route("/healthz", get(system::health))
}
