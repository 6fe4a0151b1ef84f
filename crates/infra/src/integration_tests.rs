//! Integration tests for the full job pipeline.
//!
//! Tests: Event → Storage → Generation → Storage → Callback
//!
//! Verifies:
//! - A text document produces a persisted deck and a COMPLETED callback
//! - Re-running a completed job is idempotent
//! - Every processing failure produces exactly one FAILED callback
//! - Invalid events are rejected without a callback
//! - The invocation deadline turns a stuck job into a FAILED callback
//! - A callback that outlives the deadline is abandoned, not awaited

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::time::Instant;
    use url::Url;

    use deckgen_core::{CallbackStatus, GenerationResult, JobDescriptor, JobError, validate_event};

    use crate::callback::{CallbackError, CallbackSender, CallbackTransport, RetryPolicy};
    use crate::generation::{GenerationError, GenerationGateway, GenerationRequest, ModelReply};
    use crate::pipeline::{JobPipeline, JobStage, PROCESSING_FAILED, PipelineSettings, VALIDATION_FAILED};
    use crate::storage::InMemoryStorage;

    const JOB_ID: &str = "550e8400-e29b-41d4-a716-446655440000";
    const INPUT_KEY: &str = "uploads/660e8400/business-plan.txt";

    const DECK_REPLY: &str = r#"```json
{"slides": [
  {"title": "Acme Rockets", "content": "Reusable launch for small payloads", "type": "title"},
  {"title": "Problem", "content": "Launch slots are scarce", "type": "problem"}
]}
```"#;

    /// Returns a fixed reply, optionally after a delay, and records requests.
    struct StubGenerator {
        reply: Result<String, GenerationError>,
        delay: Option<Duration>,
        requests: Mutex<Vec<GenerationRequest>>,
        calls: AtomicUsize,
    }

    impl StubGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                delay: None,
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(text: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                delay: Some(delay),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> GenerationRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerationGateway for StubGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().map(|text| ModelReply {
                text,
                model: request.model.clone(),
                input_tokens: Some(1200),
                output_tokens: Some(340),
            })
        }
    }

    /// Records every callback; answers with scripted statuses, then 200.
    #[derive(Default)]
    struct RecordingTransport {
        statuses: Mutex<VecDeque<u16>>,
        posts: Mutex<Vec<(Url, Value)>>,
        stall: Option<Duration>,
    }

    impl RecordingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn always(status: u16) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(vec![status; 16].into()),
                ..Self::default()
            })
        }

        /// Every post blocks for `stall` before answering.
        fn stalling(stall: Duration) -> Arc<Self> {
            Arc::new(Self {
                stall: Some(stall),
                ..Self::default()
            })
        }

        fn posts(&self) -> Vec<(Url, Value)> {
            self.posts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallbackTransport for RecordingTransport {
        async fn post_json(&self, url: &Url, body: &Value) -> Result<u16, CallbackError> {
            self.posts.lock().unwrap().push((url.clone(), body.clone()));
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            Ok(self.statuses.lock().unwrap().pop_front().unwrap_or(200))
        }
    }

    type TestPipeline =
        JobPipeline<Arc<InMemoryStorage>, Arc<StubGenerator>, Arc<RecordingTransport>>;

    fn setup(
        generator: Arc<StubGenerator>,
        transport: Arc<RecordingTransport>,
    ) -> (TestPipeline, Arc<InMemoryStorage>) {
        setup_with(generator, transport, PipelineSettings::default())
    }

    fn setup_with(
        generator: Arc<StubGenerator>,
        transport: Arc<RecordingTransport>,
        settings: PipelineSettings,
    ) -> (TestPipeline, Arc<InMemoryStorage>) {
        let storage = InMemoryStorage::arc();
        let callbacks = CallbackSender::new(transport, RetryPolicy::linear(3, Duration::from_secs(2)));
        let pipeline = JobPipeline::new(storage.clone(), generator, callbacks, settings);
        (pipeline, storage)
    }

    fn reserving(reserve: Duration) -> PipelineSettings {
        PipelineSettings {
            deadline_reserve: reserve,
            ..PipelineSettings::default()
        }
    }

    fn event(s3_key: &str) -> Value {
        json!({
            "jobId": JOB_ID,
            "projectId": "660e8400-e29b-41d4-a716-446655440001",
            "userId": "770e8400-e29b-41d4-a716-446655440002",
            "s3Key": s3_key,
            "callbackUrl": "http://backend.local/api/v1/generate/callback"
        })
    }

    fn job(s3_key: &str) -> JobDescriptor {
        validate_event(&event(s3_key)).unwrap()
    }

    fn expected_key() -> String {
        format!("pitchdecks/{JOB_ID}/result.json")
    }

    #[tokio::test]
    async fn text_document_produces_deck_and_completed_callback() {
        let generator = StubGenerator::replying(DECK_REPLY);
        let transport = RecordingTransport::new();
        let (pipeline, storage) = setup(generator.clone(), transport.clone());
        storage.insert(INPUT_KEY, "Acme builds small reusable rockets.");

        let response = pipeline.handle(&event(INPUT_KEY), None).await;

        assert_eq!(response.status_code, 200);
        let body = serde_json::to_value(&response.body).unwrap();
        assert_eq!(body["status"], "COMPLETED");
        assert_eq!(body["jobId"], JOB_ID);
        assert_eq!(body["outputS3Key"], expected_key());
        assert_eq!(body["callbackSent"], true);
        assert_eq!(body["idempotent"], false);
        assert_eq!(body["slidesCount"], 2);

        let stored = storage.get(&expected_key()).expect("result persisted");
        assert_eq!(stored.content_type.as_deref(), Some("application/json"));
        assert_eq!(stored.tags["job-id"], JOB_ID);
        assert_eq!(stored.tags["model"], "claude-sonnet-4-20250514");
        let result: GenerationResult = serde_json::from_slice(&stored.body).unwrap();
        assert_eq!(result.slides.len(), 2);
        assert_eq!(result.slides[1].category, "problem");
        assert_eq!(result.metadata.model, "claude-sonnet-4-20250514");
        assert_eq!(result.metadata.input_tokens, Some(1200));
        assert_eq!(result.metadata.output_tokens, Some(340));

        let request = generator.last_request();
        assert!(request.user_prompt.contains("DOCUMENT CONTENT:"));
        assert!(request.user_prompt.contains("Acme builds small reusable rockets."));
        assert_eq!(request.max_tokens, 8000);

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0.path(), "/api/v1/generate/callback");
        let body = &posts[0].1;
        assert_eq!(body["jobId"], JOB_ID);
        assert_eq!(body["status"], "COMPLETED");
        assert_eq!(body["outputS3Key"], expected_key());
        assert!(body.get("errorMessage").is_none());
        assert!(body["generatedAt"].is_string());
    }

    #[tokio::test]
    async fn rerunning_a_completed_job_skips_generation() {
        let generator = StubGenerator::replying(DECK_REPLY);
        let transport = RecordingTransport::new();
        let (pipeline, storage) = setup(generator.clone(), transport.clone());
        storage.insert(INPUT_KEY, "Acme builds small reusable rockets.");
        let job = job(INPUT_KEY);

        let first = pipeline.run(&job, None).await;
        let second = pipeline.run(&job, None).await;

        assert_eq!(first.stage, JobStage::Done);
        assert!(!first.idempotent);
        assert_eq!(second.stage, JobStage::IdempotentHit);
        assert!(second.idempotent);
        assert_eq!(second.slides_count, None);
        assert_eq!(first.output_key, second.output_key);

        assert_eq!(generator.calls(), 1);
        assert_eq!(storage.upload_count(), 1);

        let posts = transport.posts();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|(_, body)| body["status"] == "COMPLETED"));
        assert_eq!(posts[1].1["outputS3Key"], expected_key());
    }

    #[tokio::test]
    async fn pdf_input_fails_before_the_model_is_called() {
        let generator = StubGenerator::replying(DECK_REPLY);
        let transport = RecordingTransport::new();
        let (pipeline, storage) = setup(generator.clone(), transport.clone());
        storage.insert("uploads/deck.pdf", b"%PDF-1.7".to_vec());

        let outcome = pipeline.run(&job("uploads/deck.pdf"), None).await;

        assert_eq!(outcome.status, CallbackStatus::Failed);
        assert_eq!(outcome.failed_stage, Some(JobStage::Extracting));
        assert!(matches!(outcome.error, Some(JobError::UnsupportedFormat { .. })));
        assert_eq!(generator.calls(), 0);
        assert_eq!(storage.upload_count(), 0);

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1["status"], "FAILED");
        let message = posts[0].1["errorMessage"].as_str().unwrap();
        assert!(message.starts_with(PROCESSING_FAILED));
        assert!(message.contains("pdf"));
        assert!(posts[0].1.get("outputS3Key").is_none());
    }

    #[tokio::test]
    async fn malformed_model_output_fails_without_persisting() {
        let generator = StubGenerator::replying("Here is your deck: slides! (not json)");
        let transport = RecordingTransport::new();
        let (pipeline, storage) = setup(generator, transport.clone());
        storage.insert(INPUT_KEY, "Acme");

        let response = pipeline.handle(&event(INPUT_KEY), None).await;

        assert_eq!(response.status_code, 500);
        assert!(response.body.error.as_deref().unwrap().starts_with(PROCESSING_FAILED));
        assert_eq!(response.body.callback_sent, Some(true));
        assert!(storage.get(&expected_key()).is_none());
        assert_eq!(transport.posts()[0].1["status"], "FAILED");
    }

    #[tokio::test]
    async fn wrong_slide_shape_fails_the_whole_deck() {
        let generator = StubGenerator::replying(
            r#"{"slides": [{"title": "Ok", "content": "c", "type": "title"}, {"content": "no title"}]}"#,
        );
        let transport = RecordingTransport::new();
        let (pipeline, storage) = setup(generator, transport.clone());
        storage.insert(INPUT_KEY, "Acme");

        let outcome = pipeline.run(&job(INPUT_KEY), None).await;

        assert_eq!(outcome.failed_stage, Some(JobStage::Generating));
        assert_eq!(storage.upload_count(), 0);
        assert!(outcome.message.unwrap().contains("wrong shape"));
    }

    #[tokio::test]
    async fn missing_input_object_fails_at_fetch() {
        let generator = StubGenerator::replying(DECK_REPLY);
        let transport = RecordingTransport::new();
        let (pipeline, _storage) = setup(generator.clone(), transport.clone());

        let outcome = pipeline.run(&job("uploads/nowhere.txt"), None).await;

        assert_eq!(outcome.failed_stage, Some(JobStage::Fetching));
        assert_eq!(
            outcome.error,
            Some(JobError::NotFound {
                key: "uploads/nowhere.txt".into()
            })
        );
        assert!(outcome.callback_sent);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_event_is_rejected_without_callback() {
        let generator = StubGenerator::replying(DECK_REPLY);
        let transport = RecordingTransport::new();
        let (pipeline, _storage) = setup(generator.clone(), transport.clone());

        let mut raw = event(INPUT_KEY);
        raw["jobId"] = json!("not-a-uuid");
        raw["s3Key"] = json!("");

        let response = pipeline.handle(&raw, None).await;

        assert_eq!(response.status_code, 400);
        let message = response.body.error.unwrap();
        assert!(message.starts_with(VALIDATION_FAILED));
        assert!(message.contains("jobId"));
        assert!(message.contains("s3Key"));
        assert!(transport.posts().is_empty());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn custom_model_and_prompts_reach_the_gateway() {
        let generator = StubGenerator::replying(DECK_REPLY);
        let transport = RecordingTransport::new();
        let (pipeline, storage) = setup(generator.clone(), transport);
        storage.insert(INPUT_KEY, "Acme");

        let mut raw = event(INPUT_KEY);
        raw["llmModel"] = json!("claude-3-opus-20240229");
        raw["systemPrompt"] = json!("You are terse.");
        raw["userPrompt"] = json!("Three slides only.");

        let response = pipeline.handle(&raw, None).await;
        assert_eq!(response.status_code, 200);

        let request = generator.last_request();
        assert_eq!(request.model, "claude-3-opus-20240229");
        assert_eq!(request.system_prompt, "You are terse.");
        assert!(request.user_prompt.starts_with("Three slides only."));

        let stored = storage.get(&expected_key()).unwrap();
        assert_eq!(stored.tags["model"], "claude-3-opus-20240229");
    }

    #[tokio::test(start_paused = true)]
    async fn callback_failure_does_not_undo_completion() {
        let generator = StubGenerator::replying(DECK_REPLY);
        let transport = RecordingTransport::always(503);
        let (pipeline, storage) = setup(generator, transport.clone());
        storage.insert(INPUT_KEY, "Acme");

        let outcome = pipeline.run(&job(INPUT_KEY), None).await;

        assert!(outcome.is_completed());
        assert!(!outcome.callback_sent);
        assert!(storage.get(&expected_key()).is_some());
        assert_eq!(transport.posts().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_turns_a_stuck_model_call_into_a_failure() {
        let generator = StubGenerator::slow(DECK_REPLY, Duration::from_secs(600));
        let transport = RecordingTransport::new();
        let (pipeline, storage) =
            setup_with(generator.clone(), transport.clone(), reserving(Duration::from_secs(30)));
        storage.insert(INPUT_KEY, "Acme");

        // 45s left, 30s reserved for the callback: the job gets 15s.
        let started = Instant::now();
        let outcome = pipeline
            .run(&job(INPUT_KEY), Some(started + Duration::from_secs(45)))
            .await;

        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(
            outcome.error,
            Some(JobError::DeadlineExceeded {
                stage: "generating".into()
            })
        );
        assert_eq!(outcome.failed_stage, Some(JobStage::Generating));
        assert_eq!(generator.calls(), 1);
        assert_eq!(storage.upload_count(), 0);

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1["status"], "FAILED");
        assert!(
            posts[0].1["errorMessage"]
                .as_str()
                .unwrap()
                .contains("deadline exceeded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn callback_stuck_past_the_deadline_is_abandoned() {
        let generator = StubGenerator::slow(DECK_REPLY, Duration::from_secs(600));
        let transport = RecordingTransport::stalling(Duration::from_secs(600));
        let (pipeline, storage) =
            setup_with(generator, transport.clone(), reserving(Duration::from_secs(30)));
        storage.insert(INPUT_KEY, "Acme");

        let started = Instant::now();
        let deadline = started + Duration::from_secs(45);
        let outcome = pipeline.run(&job(INPUT_KEY), Some(deadline)).await;

        // Work stops at 15s; the stalled callback is cut off at 45s.
        assert!(Instant::now() <= deadline + Duration::from_millis(10));
        assert!(started.elapsed() >= Duration::from_secs(45));
        assert_eq!(outcome.status, CallbackStatus::Failed);
        assert!(!outcome.callback_sent);
        assert_eq!(transport.posts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_callback_is_also_bounded_by_the_deadline() {
        let transport = RecordingTransport::stalling(Duration::from_secs(600));
        let (pipeline, storage) = setup_with(
            StubGenerator::replying(DECK_REPLY),
            transport.clone(),
            reserving(Duration::from_secs(30)),
        );
        storage.insert(INPUT_KEY, "Acme");

        let started = Instant::now();
        let outcome = pipeline
            .run(&job(INPUT_KEY), Some(started + Duration::from_secs(45)))
            .await;

        assert!(started.elapsed() <= Duration::from_secs(46));
        assert_eq!(outcome.status, CallbackStatus::Completed);
        assert!(!outcome.callback_sent);
        assert!(storage.get(&expected_key()).is_some());
    }
}
