//! Job pipeline: execute one generation job end to end.
//!
//! ## Flow
//!
//! 1. Derive the canonical output key from the job id
//! 2. Idempotency: if the output exists, skip straight to notification
//! 3. Fetch the input document
//! 4. Extract plain text
//! 5. Generate, strip fences, parse JSON
//! 6. Validate the slide shape (all or nothing)
//! 7. Persist the result with audit tags
//! 8. Notify: COMPLETED on both the fresh and the idempotent path, FAILED
//!    with a message on any error in 2–7
//!
//! Nothing in steps 2–7 is retried here. The unit of retry is re-invoking the
//! whole job, which the idempotency check makes safe. Only the callback has
//! its own retry policy.

pub mod outcome;
pub mod stage;

use std::time::{Duration, Instant as StdInstant};

use chrono::Utc;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{error, info, warn};

use deckgen_core::{
    CallbackStatus, GenerationMetadata, GenerationResult, JobDescriptor, JobError, JobResult,
    OutputLayout, parse_slides, validate_event,
};

use crate::callback::{CallbackSender, CallbackTransport};
use crate::extract::extract_text;
use crate::generation::{GenerationError, GenerationGateway, GenerationRequest, prompts, response};
use crate::storage::{ObjectTags, StorageError, StorageGateway};

pub use outcome::{InvocationBody, InvocationResponse, JobOutcome, PROCESSING_FAILED, VALIDATION_FAILED};
pub use stage::JobStage;

use stage::StageTracker;

/// Pipeline tuning that is not owned by a gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub layout: OutputLayout,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Time kept back from the invocation deadline for the final callback.
    /// Should cover the callback's worst-case delivery; whatever the
    /// callback still needs at the deadline itself is abandoned.
    pub deadline_reserve: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            layout: OutputLayout::default(),
            max_tokens: 8000,
            temperature: 0.7,
            deadline_reserve: Duration::from_secs(96),
        }
    }
}

/// Successful end of steps 2–7.
#[derive(Debug)]
struct Processed {
    output_key: String,
    idempotent: bool,
    slides_count: Option<usize>,
}

/// Composes storage, model and callback gateways to run one job.
///
/// Gateways are built once per process and injected; the pipeline holds no
/// per-job state between invocations.
pub struct JobPipeline<S, G, T> {
    storage: S,
    generator: G,
    callbacks: CallbackSender<T>,
    settings: PipelineSettings,
}

impl<S, G, T> JobPipeline<S, G, T>
where
    S: StorageGateway,
    G: GenerationGateway,
    T: CallbackTransport,
{
    pub fn new(storage: S, generator: G, callbacks: CallbackSender<T>, settings: PipelineSettings) -> Self {
        Self {
            storage,
            generator,
            callbacks,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Validate a raw request and run it. Always returns a structured response.
    ///
    /// A request that fails validation gets no callback: the callback URL is
    /// only trusted once the whole request is valid.
    pub async fn handle(&self, raw: &Value, deadline: Option<Instant>) -> InvocationResponse {
        let job = match validate_event(raw) {
            Ok(job) => job,
            Err(e) => {
                let message = format!("{VALIDATION_FAILED}{e}");
                error!(error = %e, "event validation failed");
                return InvocationResponse::validation_failed(message);
            }
        };

        info!(
            job_id = %job.job_id(),
            project_id = %job.project_id(),
            user_id = %job.user_id(),
            s3_key = %job.input_key(),
            llm_model = %job.model(),
            "event validation successful"
        );

        InvocationResponse::from_outcome(&self.run(&job, deadline).await)
    }

    /// Run a validated job through every stage and send its callback.
    pub async fn run(&self, job: &JobDescriptor, deadline: Option<Instant>) -> JobOutcome {
        let started = StdInstant::now();
        let tracker = StageTracker::new(job.job_id());

        let work = self.process(job, &tracker, started);
        let result = match deadline {
            Some(deadline) => {
                let budget = deadline
                    .checked_sub(self.settings.deadline_reserve)
                    .unwrap_or(deadline);
                match tokio::time::timeout_at(budget, work).await {
                    Ok(result) => result,
                    Err(_) => Err(JobError::DeadlineExceeded {
                        stage: tracker.current().to_string(),
                    }),
                }
            }
            None => work.await,
        };

        match result {
            Ok(done) => {
                tracker.enter(JobStage::Notifying);
                let callback_sent = within_deadline(
                    job,
                    deadline,
                    self.callbacks
                        .send_success(job.callback_url(), job.job_id(), &done.output_key),
                )
                .await;
                if !callback_sent {
                    warn!(job_id = %job.job_id(), "callback failed but processing succeeded");
                }

                let stage = if done.idempotent {
                    JobStage::IdempotentHit
                } else {
                    JobStage::Done
                };
                tracker.enter(stage);

                JobOutcome {
                    job_id: job.job_id(),
                    status: CallbackStatus::Completed,
                    stage,
                    failed_stage: None,
                    output_key: Some(done.output_key),
                    error: None,
                    message: None,
                    idempotent: done.idempotent,
                    callback_sent,
                    duration_ms: elapsed_ms(started),
                    slides_count: done.slides_count,
                }
            }
            Err(err) => {
                let failed_stage = tracker.current();
                tracker.enter(JobStage::Failed);

                let message = format!("{PROCESSING_FAILED}{err}");
                error!(
                    job_id = %job.job_id(),
                    stage = %failed_stage,
                    error = %err,
                    "job failed"
                );

                let callback_sent = within_deadline(
                    job,
                    deadline,
                    self.callbacks
                        .send_failure(job.callback_url(), job.job_id(), &message),
                )
                .await;

                JobOutcome {
                    job_id: job.job_id(),
                    status: CallbackStatus::Failed,
                    stage: JobStage::Failed,
                    failed_stage: Some(failed_stage),
                    output_key: None,
                    error: Some(err),
                    message: Some(message),
                    idempotent: false,
                    callback_sent,
                    duration_ms: elapsed_ms(started),
                    slides_count: None,
                }
            }
        }
    }

    async fn process(
        &self,
        job: &JobDescriptor,
        tracker: &StageTracker,
        started: StdInstant,
    ) -> JobResult<Processed> {
        let output_key = self.settings.layout.output_key(job.job_id());

        if self.storage.exists(&output_key).await? {
            info!(
                job_id = %job.job_id(),
                output_key = %output_key,
                "job already processed (idempotent), skipping generation"
            );
            return Ok(Processed {
                output_key,
                idempotent: true,
                slides_count: None,
            });
        }

        tracker.enter(JobStage::Fetching);
        let document = self.storage.download(job.input_key()).await?;

        tracker.enter(JobStage::Extracting);
        let text = extract_text(&document, job.input_key())?;
        info!(job_id = %job.job_id(), chars = text.chars().count(), "extracted document text");

        tracker.enter(JobStage::Generating);
        let request = GenerationRequest {
            model: job.model().to_string(),
            system_prompt: prompts::system_prompt(job.system_prompt()),
            user_prompt: prompts::user_prompt(&text, job.user_prompt()),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let reply = self.generator.generate(&request).await?;
        let parsed = response::extract_json(&reply.text)?;
        let slides =
            parse_slides(&parsed).map_err(|e| GenerationError::InvalidShape(e.to_string()))?;

        tracker.enter(JobStage::Persisting);
        let result = GenerationResult {
            metadata: GenerationMetadata {
                model: reply.model,
                duration_ms: elapsed_ms(started),
                generated_at: Utc::now(),
                input_tokens: reply.input_tokens,
                output_tokens: reply.output_tokens,
            },
            slides,
        };
        let slides_count = result.slides.len();
        let document = serde_json::to_value(&result)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage
            .upload_json(&output_key, &document, &audit_tags(job))
            .await?;

        info!(
            job_id = %job.job_id(),
            output_key = %output_key,
            duration_ms = result.metadata.duration_ms,
            slides_count,
            input_tokens = ?result.metadata.input_tokens,
            output_tokens = ?result.metadata.output_tokens,
            "pitch deck generation completed"
        );

        Ok(Processed {
            output_key,
            idempotent: false,
            slides_count: Some(slides_count),
        })
    }
}

/// Runs a callback delivery, giving up at the hard invocation deadline.
async fn within_deadline<F>(job: &JobDescriptor, deadline: Option<Instant>, send: F) -> bool
where
    F: Future<Output = bool>,
{
    let Some(deadline) = deadline else {
        return send.await;
    };
    match tokio::time::timeout_at(deadline, send).await {
        Ok(sent) => sent,
        Err(_) => {
            error!(job_id = %job.job_id(), "callback abandoned at invocation deadline");
            false
        }
    }
}

fn audit_tags(job: &JobDescriptor) -> ObjectTags {
    ObjectTags::from([
        ("job-id".to_string(), job.job_id().to_string()),
        ("project-id".to_string(), job.project_id().to_string()),
        ("user-id".to_string(), job.user_id().to_string()),
        ("model".to_string(), job.model().to_string()),
    ])
}

fn elapsed_ms(started: StdInstant) -> u64 {
    started.elapsed().as_millis() as u64
}
