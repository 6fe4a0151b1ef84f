//! `POST /invoke`: run one job and report how it ended.

use axum::body::Bytes;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{error, warn};

use deckgen_infra::InvocationResponse;
use deckgen_infra::pipeline::VALIDATION_FAILED;

use crate::app::AppState;
use crate::app::errors::{invocation_to_response, json_error};

/// The body is taken as raw bytes so that a malformed document still gets the
/// structured 400 body instead of the framework's rejection.
///
/// The job runs on its own task: if the caller hangs up, the request future
/// is dropped but the job still finishes and sends its callback.
pub async fn invoke(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let deadline = Instant::now() + state.deadline;

    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "request body is not JSON");
            return invocation_to_response(InvocationResponse::validation_failed(format!(
                "{VALIDATION_FAILED}request body is not valid JSON: {e}"
            )));
        }
    };

    let pipeline = state.pipeline.clone();
    let job = tokio::spawn(async move { pipeline.handle(&raw, Some(deadline)).await });

    match job.await {
        Ok(response) => invocation_to_response(response),
        Err(e) => {
            error!(error = %e, "job task did not complete");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "job_aborted", e.to_string())
        }
    }
}
