//! Callback delivery with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};
use url::Url;

use deckgen_core::{CallbackPayload, JobId};

use super::retry::RetryPolicy;

/// Callback delivery error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallbackError {
    #[error("callback request failed: {0}")]
    Transport(String),
    #[error("callback rejected with client error {status} on final attempt {attempt}")]
    Rejected { status: u16, attempt: u32 },
    #[error("callback delivery exhausted after {attempts} attempt(s): {last_error}")]
    DeliveryExhausted { attempts: u32, last_error: String },
}

/// One HTTP POST of a JSON body. Returns the response status code.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    async fn post_json(&self, url: &Url, body: &serde_json::Value) -> Result<u16, CallbackError>;
}

#[async_trait]
impl<T> CallbackTransport for Arc<T>
where
    T: CallbackTransport + ?Sized,
{
    async fn post_json(&self, url: &Url, body: &serde_json::Value) -> Result<u16, CallbackError> {
        (**self).post_json(url, body).await
    }
}

/// reqwest transport with a fixed per-attempt timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, CallbackError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CallbackError::Transport(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackTransport for HttpTransport {
    async fn post_json(&self, url: &Url, body: &serde_json::Value) -> Result<u16, CallbackError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallbackError::Transport(format!("timed out: {}", e))
                } else {
                    CallbackError::Transport(e.to_string())
                }
            })?;
        Ok(response.status().as_u16())
    }
}

/// Delivers terminal job status to the caller's backend.
///
/// Attempt `n` that fails is followed by a `base_delay * n` sleep, except
/// after the last attempt. Any non-2xx status, transport error or timeout
/// counts as a failure. A 4xx is treated as final only when it lands on the
/// last allowed attempt; a 4xx on an earlier attempt is retried like a 5xx.
#[derive(Debug, Clone)]
pub struct CallbackSender<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: CallbackTransport> CallbackSender<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        info!(
            max_attempts = policy.max_attempts,
            base_delay_ms = policy.base_delay.as_millis() as u64,
            "callback sender initialized"
        );
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `payload`; true when delivered. Never propagates failure.
    pub async fn send(&self, url: &Url, payload: &CallbackPayload) -> bool {
        match self.deliver(url, payload).await {
            Ok(_) => true,
            Err(e) => {
                error!(job_id = %payload.job_id(), error = %e, "callback delivery failed");
                false
            }
        }
    }

    pub async fn send_success(&self, url: &Url, job_id: JobId, output_key: &str) -> bool {
        self.send(url, &CallbackPayload::completed(job_id, output_key)).await
    }

    pub async fn send_failure(&self, url: &Url, job_id: JobId, error_message: &str) -> bool {
        self.send(url, &CallbackPayload::failed(job_id, error_message)).await
    }

    /// Run the attempt loop. Returns the attempt number that succeeded.
    pub async fn deliver(&self, url: &Url, payload: &CallbackPayload) -> Result<u32, CallbackError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| CallbackError::Transport(format!("encode payload: {}", e)))?;
        let max = self.policy.max_attempts;

        info!(
            job_id = %payload.job_id(),
            status = %payload.status(),
            url = %url,
            "sending callback"
        );

        let mut last_error = String::new();
        for attempt in 1..=max {
            info!(job_id = %payload.job_id(), attempt, max_attempts = max, "callback attempt");

            match self.transport.post_json(url, &body).await {
                Ok(status) if (200..300).contains(&status) => {
                    info!(job_id = %payload.job_id(), attempt, status, "callback delivered");
                    return Ok(attempt);
                }
                Ok(status) => {
                    warn!(job_id = %payload.job_id(), attempt, status, "callback failed with HTTP error");
                    if status < 500 && attempt >= max {
                        return Err(CallbackError::Rejected { status, attempt });
                    }
                    last_error = format!("HTTP {}", status);
                }
                Err(e) => {
                    warn!(job_id = %payload.job_id(), attempt, error = %e, "callback request failed");
                    last_error = e.to_string();
                }
            }

            if self.policy.should_retry(attempt) {
                let delay = self.policy.delay_for_attempt(attempt);
                info!(job_id = %payload.job_id(), delay_ms = delay.as_millis() as u64, "waiting before callback retry");
                tokio::time::sleep(delay).await;
            }
        }

        Err(CallbackError::DeliveryExhausted {
            attempts: max,
            last_error,
        })
    }
}
