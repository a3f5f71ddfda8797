//! Upload orchestration: validate → grant → upload → wait → poll.
//!
//! One run is live at a time. The run state lives in a `watch` channel so
//! observers (a progress bar, a UI) can follow it. Selecting a file or
//! resetting supersedes any in-flight run by bumping the generation. The
//! superseded run's outstanding request is not cancelled, but every write it
//! attempts afterwards is compared against the live generation and dropped,
//! and it issues no further requests.

use std::error::Error as StdError;
use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::Utc;
use imgpipe_api_client::ApiClient;
use imgpipe_core::{
    CandidateFile, ClientConfig, DelayEstimator, ErrorMetadata, FileValidator, GrantIssuer,
    LogLevel, ObjectUploader, PipelineError, SizeTieredDelay, ValidationError, VariantSet,
};
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::poller::{PollError, PollEvent, PollPolicy, ProcessingPoller};
use crate::sleeper::TokioSleeper;
use crate::state::{FailureReport, Progress, RunSnapshot, RunState};

pub struct UploadOrchestrator {
    validator: FileValidator,
    grants: Arc<dyn GrantIssuer>,
    uploader: Arc<dyn ObjectUploader>,
    poller: ProcessingPoller,
    delay: Arc<dyn DelayEstimator>,
    state: watch::Sender<RunSnapshot>,
}

impl UploadOrchestrator {
    pub fn new(
        validator: FileValidator,
        grants: Arc<dyn GrantIssuer>,
        uploader: Arc<dyn ObjectUploader>,
        poller: ProcessingPoller,
        delay: Arc<dyn DelayEstimator>,
    ) -> Self {
        let (state, _) = watch::channel(RunSnapshot::default());
        Self {
            validator,
            grants,
            uploader,
            poller,
            delay,
            state,
        }
    }

    /// Wire every seam to the HTTP client, with real sleeps and the default
    /// size-tiered delay.
    pub fn from_client(client: Arc<ApiClient>, config: &ClientConfig) -> Self {
        let poller = ProcessingPoller::new(
            client.clone(),
            Arc::new(TokioSleeper),
            PollPolicy::from_config(config),
        );

        Self::new(
            FileValidator::new(config.max_file_size_bytes),
            client.clone(),
            client,
            poller,
            Arc::new(SizeTieredDelay::default()),
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.state.borrow().clone()
    }

    /// Wait the backend is expected to need for a file of `file_size` bytes.
    pub fn estimated_processing_time(&self, file_size: u64) -> std::time::Duration {
        self.delay.initial_delay(file_size)
    }

    /// Validate `file` and make it the selection, superseding any run in
    /// flight. A rejected file leaves the pipeline idle.
    pub fn select_file(&self, file: CandidateFile) -> Result<(), ValidationError> {
        let verdict = self.validator.validate(&file);

        let next = match &verdict {
            Ok(()) => {
                tracing::debug!(filename = %file.name, size = file.size, "File selected");
                RunState::FileSelected { file }
            }
            Err(e) => {
                tracing::debug!(
                    filename = %file.name,
                    reason = e.reason(),
                    error = %e,
                    "File rejected"
                );
                RunState::Idle
            }
        };

        self.state.send_modify(|snap| snap.supersede(next));
        verdict
    }

    /// Return to idle, discarding the selection and any run results.
    /// Resetting an idle pipeline changes nothing.
    pub fn reset(&self) {
        self.state.send_if_modified(|snap| {
            if matches!(snap.state, RunState::Idle) {
                return false;
            }
            snap.supersede(RunState::Idle);
            true
        });
    }

    /// Run the pipeline for the selected file.
    pub async fn start(&self) -> Result<VariantSet, PipelineError> {
        let mut claimed = None;
        self.state.send_if_modified(|snap| {
            let RunState::FileSelected { file } = &snap.state else {
                return false;
            };
            let file = file.clone();
            let run_id = Uuid::new_v4();

            snap.run_id = Some(run_id);
            snap.started_at = Some(Utc::now());
            snap.finished_at = None;
            snap.state = RunState::Uploading {
                file: file.clone(),
                progress: Progress::GrantRequested,
            };
            claimed = Some((snap.generation, run_id, file));
            true
        });

        let (generation, run_id, file) = claimed.ok_or(PipelineError::NoFileSelected)?;

        let span = tracing::info_span!(
            "upload_run",
            run_id = %run_id,
            filename = %file.name,
            size = file.size
        );
        self.run(generation, file).instrument(span).await
    }

    async fn run(&self, generation: u64, file: CandidateFile) -> Result<VariantSet, PipelineError> {
        tracing::info!("Upload run started");

        match self.drive(generation, &file).await {
            Ok((key, variants)) => {
                let recorded = self.transition(generation, |snap| {
                    snap.state = RunState::Completed {
                        file: file.clone(),
                        key: key.clone(),
                        variants: variants.clone(),
                    };
                    snap.finished_at = Some(Utc::now());
                });
                if !recorded {
                    tracing::debug!("Run superseded; discarding variants");
                    return Err(PipelineError::Superseded);
                }

                tracing::info!(
                    key = %key,
                    variant_count = variants.len(),
                    "Upload run completed"
                );
                Ok(variants)
            }
            Err(PipelineError::Superseded) => {
                tracing::debug!("Run superseded; stopped before next step");
                Err(PipelineError::Superseded)
            }
            Err(err) => {
                let failure = FailureReport::from(&err);
                let recorded = self.transition(generation, |snap| {
                    snap.state = RunState::Failed {
                        file: Some(file.clone()),
                        failure,
                    };
                    snap.finished_at = Some(Utc::now());
                });
                if !recorded {
                    tracing::debug!(error = %err, "Run superseded; discarding failure");
                    return Err(PipelineError::Superseded);
                }

                log_failure(&err);
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        generation: u64,
        file: &CandidateFile,
    ) -> Result<(String, VariantSet), PipelineError> {
        let grant = self
            .grants
            .request_grant(&file.name, &file.content_type)
            .await?;
        tracing::info!(key = %grant.key, "Upload grant acquired");
        self.advance(
            generation,
            RunState::Uploading {
                file: file.clone(),
                progress: Progress::GrantAcquired,
            },
        )?;

        self.uploader.upload(&grant.upload_url, file).await?;
        tracing::info!(key = %grant.key, "File written to storage");

        let max_attempts = self.poller.policy().max_attempts.max(1);
        self.advance(
            generation,
            RunState::Processing {
                file: file.clone(),
                grant: grant.clone(),
                progress: Progress::Uploaded,
                attempt: 0,
                max_attempts,
            },
        )?;

        let initial_delay = self.delay.initial_delay(file.size);
        tracing::debug!(
            key = %grant.key,
            initial_delay_ms = initial_delay.as_millis() as u64,
            "Waiting for backend processing"
        );

        // Poll by the canonicalized key; the backend files output under it.
        let variants = self
            .poller
            .poll(&grant.key, initial_delay, |event| {
                let (progress, attempt) = match event {
                    PollEvent::Waiting { .. } => (Progress::AwaitingProcessing, 0),
                    PollEvent::Querying { attempt, .. } => (Progress::Retrieving, attempt),
                    PollEvent::Retrying { attempt, .. } => (Progress::Retrieving, attempt + 1),
                };

                let current = self.transition(generation, |snap| {
                    if let RunState::Processing {
                        progress: p,
                        attempt: a,
                        ..
                    } = &mut snap.state
                    {
                        *p = progress;
                        *a = attempt;
                    }
                });

                if current {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            })
            .await
            .map_err(|e| match e {
                PollError::Exhausted { attempts } => PipelineError::ProcessingTimeout { attempts },
                PollError::Abandoned => PipelineError::Superseded,
            })?;

        Ok((grant.key, variants))
    }

    /// Apply `update` only while `generation` is still live.
    fn transition<F>(&self, generation: u64, update: F) -> bool
    where
        F: FnOnce(&mut RunSnapshot),
    {
        self.state.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }
            update(snap);
            true
        })
    }

    fn advance(&self, generation: u64, state: RunState) -> Result<(), PipelineError> {
        if self.transition(generation, |snap| snap.state = state) {
            Ok(())
        } else {
            Err(PipelineError::Superseded)
        }
    }
}

fn log_failure(err: &PipelineError) {
    let detail = error_chain(err);
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            error_code = err.error_code(),
            error = %err,
            detail = %detail,
            "Upload run failed"
        ),
        LogLevel::Warn => tracing::warn!(
            error_code = err.error_code(),
            error = %err,
            detail = %detail,
            "Upload run failed"
        ),
        LogLevel::Error => tracing::error!(
            error_code = err.error_code(),
            error = %err,
            detail = %detail,
            "Upload run failed"
        ),
    }
}

fn error_chain(err: &dyn StdError) -> String {
    std::iter::successors(err.source(), |e: &&dyn StdError| (*e).source())
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        declared_file, FakeGrantIssuer, FakeUploader, RecordingSleeper, ScriptedVariantSource,
    };
    use async_trait::async_trait;
    use imgpipe_core::{NetworkError, Resolution, VariantSource};
    use std::sync::{Mutex, OnceLock, Weak};
    use std::time::Duration;
    use tokio::sync::Notify;

    const MB: u64 = 1000 * 1000;
    const MIB: u64 = 1024 * 1024;
    const GRANT_URL: &str = "https://input.example/put/a1b2-photo";
    const KEY: &str = "a1b2-photo";

    struct Harness {
        orchestrator: UploadOrchestrator,
        grants: Arc<FakeGrantIssuer>,
        uploader: Arc<FakeUploader>,
        source: Arc<ScriptedVariantSource>,
        sleeper: Arc<RecordingSleeper>,
    }

    fn harness(
        grants: FakeGrantIssuer,
        uploader: FakeUploader,
        source: ScriptedVariantSource,
    ) -> Harness {
        let grants = Arc::new(grants);
        let uploader = Arc::new(uploader);
        let source = Arc::new(source);
        let sleeper = Arc::new(RecordingSleeper::default());
        let poller = ProcessingPoller::new(source.clone(), sleeper.clone(), PollPolicy::default());
        let orchestrator = UploadOrchestrator::new(
            FileValidator::default(),
            grants.clone(),
            uploader.clone(),
            poller,
            Arc::new(SizeTieredDelay::default()),
        );
        Harness {
            orchestrator,
            grants,
            uploader,
            source,
            sleeper,
        }
    }

    fn happy(source: ScriptedVariantSource) -> Harness {
        harness(
            FakeGrantIssuer::granting(GRANT_URL, KEY),
            FakeUploader::succeeding(),
            source,
        )
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[tokio::test]
    async fn test_small_jpeg_completes_with_all_variants() {
        let h = happy(ScriptedVariantSource::new(vec![Ok(
            ScriptedVariantSource::full(KEY),
        )]));

        tokio_test::assert_ok!(h
            .orchestrator
            .select_file(declared_file("photo.jpg", "image/jpeg", 500 * 1000)));
        let variants = tokio_test::assert_ok!(h.orchestrator.start().await);

        assert_eq!(variants.len(), 3);
        for r in Resolution::ALL {
            assert!(variants.get(r).is_some(), "{r} missing");
        }

        assert_eq!(
            h.grants.calls(),
            vec![("photo.jpg".to_string(), "image/jpeg".to_string())]
        );
        assert_eq!(h.uploader.calls()[0].0, GRANT_URL);
        // Polls by canonicalized key, never the original filename.
        assert_eq!(h.source.calls(), vec![KEY.to_string()]);
        assert_eq!(h.sleeper.recorded(), vec![ms(2000)]);

        let snap = h.orchestrator.snapshot();
        assert!(matches!(snap.state, RunState::Completed { .. }));
        assert_eq!(snap.state.progress_percent(), 100);
        assert!(snap.run_id.is_some());
        assert!(snap.started_at.is_some());
        assert!(snap.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_large_png_completes_with_partial_set_after_retries() {
        let mut only_720 = VariantSet::default();
        only_720.insert(Resolution::P720, "https://out.example/720p/a1b2-photo");
        let h = happy(ScriptedVariantSource::new(vec![
            Err("404".to_string()),
            Err("404".to_string()),
            Ok(only_720.clone()),
        ]));

        h.orchestrator
            .select_file(declared_file("scan.png", "image/png", 20 * MB))
            .unwrap();
        let variants = h.orchestrator.start().await.unwrap();

        assert_eq!(variants, only_720);
        assert_eq!(variants.get(Resolution::P1080), None);
        assert_eq!(variants.get(Resolution::P480), None);
        assert_eq!(h.source.calls().len(), 3);
        assert_eq!(h.sleeper.recorded(), vec![ms(6000), ms(3000), ms(3000)]);

        match h.orchestrator.snapshot().state {
            RunState::Completed { key, variants, .. } => {
                assert_eq!(key, KEY);
                assert_eq!(variants.len(), 1);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exhausted_polling_fails_with_timeout() {
        let h = happy(ScriptedVariantSource::failing());

        h.orchestrator
            .select_file(declared_file("photo.png", "image/png", 3 * MIB))
            .unwrap();
        let err = h.orchestrator.start().await.unwrap_err();

        assert!(matches!(err, PipelineError::ProcessingTimeout { attempts: 3 }));
        assert_eq!(h.source.calls().len(), 3);
        assert_eq!(h.sleeper.recorded(), vec![ms(4000), ms(3000), ms(3000)]);

        match h.orchestrator.snapshot().state {
            RunState::Failed { file, failure } => {
                assert_eq!(failure.error_code, "PROCESSING_TIMEOUT");
                assert!(failure.message.contains("taking longer than expected"));
                assert!(failure.message.contains("JPEG"));
                assert_eq!(file.unwrap().name, "photo.png");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_oversized_file_never_touches_network() {
        let h = happy(ScriptedVariantSource::failing());

        let err = h
            .orchestrator
            .select_file(declared_file("huge.jpg", "image/jpeg", 60 * MB))
            .unwrap_err();
        assert_eq!(err.reason(), "too large");
        assert_eq!(h.orchestrator.snapshot().state, RunState::Idle);

        let start = h.orchestrator.start().await;
        assert!(matches!(start, Err(PipelineError::NoFileSelected)));

        assert!(h.grants.calls().is_empty());
        assert!(h.uploader.calls().is_empty());
        assert!(h.source.calls().is_empty());
        assert!(h.sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_non_image_never_touches_network() {
        let h = happy(ScriptedVariantSource::failing());

        for ct in ["application/pdf", "text/plain", "video/mp4"] {
            let err = h
                .orchestrator
                .select_file(declared_file("file", ct, 10))
                .unwrap_err();
            assert_eq!(err.reason(), "invalid type");
            assert!(h.orchestrator.start().await.is_err());
        }

        assert!(h.grants.calls().is_empty());
        assert!(h.uploader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_grant_failure_aborts_run() {
        let h = harness(
            FakeGrantIssuer::failing(),
            FakeUploader::succeeding(),
            ScriptedVariantSource::failing(),
        );

        h.orchestrator
            .select_file(declared_file("photo.jpg", "image/jpeg", 1000))
            .unwrap();
        let err = h.orchestrator.start().await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Network(NetworkError::GrantUnavailable { .. })
        ));
        assert_eq!(h.grants.calls().len(), 1);
        assert!(h.uploader.calls().is_empty());
        assert!(h.source.calls().is_empty());

        match h.orchestrator.snapshot().state {
            RunState::Failed { failure, .. } => {
                assert_eq!(failure.message, "could not obtain upload grant")
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_failure_is_not_retried() {
        let h = harness(
            FakeGrantIssuer::granting(GRANT_URL, KEY),
            FakeUploader::failing(),
            ScriptedVariantSource::failing(),
        );

        h.orchestrator
            .select_file(declared_file("photo.jpg", "image/jpeg", 1000))
            .unwrap();
        let err = h.orchestrator.start().await.unwrap_err();

        assert_eq!(err.to_string(), "upload failed");
        assert_eq!(h.uploader.calls().len(), 1);
        assert!(h.source.calls().is_empty());
        assert!(h.sleeper.recorded().is_empty());

        match h.orchestrator.snapshot().state {
            RunState::Failed { failure, .. } => assert_eq!(failure.message, "upload failed"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_variant_set_is_completion() {
        let h = happy(ScriptedVariantSource::new(vec![Ok(VariantSet::default())]));

        h.orchestrator
            .select_file(declared_file("photo.jpg", "image/jpeg", 1000))
            .unwrap();
        let variants = h.orchestrator.start().await.unwrap();

        assert!(variants.is_empty());
        assert!(matches!(
            h.orchestrator.snapshot().state,
            RunState::Completed { .. }
        ));
    }

    #[tokio::test]
    async fn test_start_without_selection() {
        let h = happy(ScriptedVariantSource::failing());
        let err = h.orchestrator.start().await.unwrap_err();
        assert!(matches!(err, PipelineError::NoFileSelected));
        assert!(h.grants.calls().is_empty());
    }

    #[tokio::test]
    async fn test_finished_run_cannot_be_restarted_without_reselect() {
        let h = happy(ScriptedVariantSource::new(vec![Ok(VariantSet::default())]));
        h.orchestrator
            .select_file(declared_file("photo.jpg", "image/jpeg", 1000))
            .unwrap();
        h.orchestrator.start().await.unwrap();

        assert!(matches!(
            h.orchestrator.start().await,
            Err(PipelineError::NoFileSelected)
        ));
        assert_eq!(h.grants.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let h = happy(ScriptedVariantSource::new(vec![Ok(
            ScriptedVariantSource::full(KEY),
        )]));
        h.orchestrator
            .select_file(declared_file("photo.jpg", "image/jpeg", 1000))
            .unwrap();
        h.orchestrator.start().await.unwrap();

        h.orchestrator.reset();
        let once = h.orchestrator.snapshot();
        h.orchestrator.reset();
        let twice = h.orchestrator.snapshot();

        assert_eq!(once, twice);
        assert_eq!(twice.state, RunState::Idle);
        assert_eq!(twice.run_id, None);
        assert_eq!(twice.state.file(), None);
    }

    #[tokio::test]
    async fn test_reselect_replaces_selection() {
        let h = happy(ScriptedVariantSource::failing());
        h.orchestrator
            .select_file(declared_file("a.jpg", "image/jpeg", 1))
            .unwrap();
        let first = h.orchestrator.snapshot().generation;
        h.orchestrator
            .select_file(declared_file("b.jpg", "image/jpeg", 1))
            .unwrap();
        let snap = h.orchestrator.snapshot();

        assert!(snap.generation > first);
        assert_eq!(snap.state.file().unwrap().name, "b.jpg");
    }

    #[tokio::test]
    async fn test_rejected_selection_discards_previous() {
        let h = happy(ScriptedVariantSource::failing());
        h.orchestrator
            .select_file(declared_file("a.jpg", "image/jpeg", 1))
            .unwrap();
        assert!(h
            .orchestrator
            .select_file(declared_file("a.txt", "text/plain", 1))
            .is_err());
        assert_eq!(h.orchestrator.snapshot().state, RunState::Idle);
    }

    #[tokio::test]
    async fn test_superseded_run_results_are_dropped() {
        let gate = Arc::new(Notify::new());
        let grants = Arc::new(FakeGrantIssuer::granting(GRANT_URL, KEY).gated(gate.clone()));
        let uploader = Arc::new(FakeUploader::succeeding());
        let source = Arc::new(ScriptedVariantSource::new(vec![Ok(
            ScriptedVariantSource::full(KEY),
        )]));
        let poller = ProcessingPoller::new(
            source.clone(),
            Arc::new(RecordingSleeper::default()),
            PollPolicy::default(),
        );
        let orchestrator = Arc::new(UploadOrchestrator::new(
            FileValidator::default(),
            grants.clone(),
            uploader.clone(),
            poller,
            Arc::new(SizeTieredDelay::default()),
        ));

        orchestrator
            .select_file(declared_file("old.jpg", "image/jpeg", 1000))
            .unwrap();
        let run = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.start().await }
        });

        while grants.calls().is_empty() {
            tokio::task::yield_now().await;
        }

        orchestrator.reset();
        orchestrator
            .select_file(declared_file("new.jpg", "image/jpeg", 1000))
            .unwrap();
        gate.notify_one();

        let result = run.await.unwrap();
        assert!(matches!(result, Err(PipelineError::Superseded)));

        // The late grant was ignored and nothing further was issued.
        assert!(uploader.calls().is_empty());
        assert!(source.calls().is_empty());
        match orchestrator.snapshot().state {
            RunState::FileSelected { file } => assert_eq!(file.name, "new.jpg"),
            other => panic!("expected FileSelected, got {other:?}"),
        }
    }

    /// Records the live progress at every seam call and sleep.
    #[derive(Default)]
    struct ProgressProbe {
        receiver: OnceLock<watch::Receiver<RunSnapshot>>,
        seen: Mutex<Vec<(&'static str, u8, String)>>,
    }

    impl ProgressProbe {
        fn record(&self, label: &'static str) {
            let snap = self.receiver.get().unwrap().borrow().clone();
            self.seen.lock().unwrap().push((
                label,
                snap.state.progress_percent(),
                snap.state.status_message(),
            ));
        }
    }

    #[async_trait]
    impl ObjectUploader for ProgressProbe {
        async fn upload(&self, _url: &str, _file: &CandidateFile) -> Result<(), NetworkError> {
            self.record("upload");
            Ok(())
        }
    }

    #[async_trait]
    impl VariantSource for ProgressProbe {
        async fn fetch_variants(&self, _key: &str) -> anyhow::Result<VariantSet> {
            self.record("query");
            let attempts = self
                .seen
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _, _)| *l == "query")
                .count();
            if attempts < 2 {
                Err(anyhow::anyhow!("not yet"))
            } else {
                Ok(VariantSet::default())
            }
        }
    }

    #[async_trait]
    impl crate::sleeper::Sleeper for ProgressProbe {
        async fn sleep(&self, _duration: Duration) {
            self.record("sleep");
        }
    }

    #[tokio::test]
    async fn test_progress_milestones_follow_the_run() {
        let probe = Arc::new(ProgressProbe::default());
        let poller = ProcessingPoller::new(probe.clone(), probe.clone(), PollPolicy::default());
        let orchestrator = UploadOrchestrator::new(
            FileValidator::default(),
            Arc::new(FakeGrantIssuer::granting(GRANT_URL, KEY)),
            probe.clone(),
            poller,
            Arc::new(SizeTieredDelay::default()),
        );
        probe.receiver.set(orchestrator.subscribe()).unwrap();

        orchestrator
            .select_file(declared_file("photo.jpg", "image/jpeg", 1000))
            .unwrap();
        orchestrator.start().await.unwrap();

        let seen = probe.seen.lock().unwrap().clone();
        let summary: Vec<(&str, u8)> = seen.iter().map(|(l, p, _)| (*l, *p)).collect();
        assert_eq!(
            summary,
            vec![
                ("upload", 20),
                ("sleep", 60),
                ("query", 80),
                ("sleep", 80),
                ("query", 80),
            ]
        );
        assert_eq!(seen[1].2, "Processing image (resizing and compressing)...");
        assert_eq!(seen[2].2, "Retrieving processed images...");
        assert_eq!(seen[3].2, "Still processing... (attempt 2/3)");
        assert_eq!(orchestrator.snapshot().state.progress_percent(), 100);
    }

    /// Resets the pipeline the first time the poller sleeps.
    struct ResettingSleeper {
        orchestrator: OnceLock<Weak<UploadOrchestrator>>,
    }

    #[async_trait]
    impl crate::sleeper::Sleeper for ResettingSleeper {
        async fn sleep(&self, _duration: Duration) {
            if let Some(o) = self.orchestrator.get().and_then(Weak::upgrade) {
                o.reset();
            }
        }
    }

    #[tokio::test]
    async fn test_reset_during_wait_stops_polling() {
        let source = Arc::new(ScriptedVariantSource::failing());
        let sleeper = Arc::new(ResettingSleeper {
            orchestrator: OnceLock::new(),
        });
        let poller = ProcessingPoller::new(source.clone(), sleeper.clone(), PollPolicy::default());
        let orchestrator = Arc::new(UploadOrchestrator::new(
            FileValidator::default(),
            Arc::new(FakeGrantIssuer::granting(GRANT_URL, KEY)),
            Arc::new(FakeUploader::succeeding()),
            poller,
            Arc::new(SizeTieredDelay::default()),
        ));
        sleeper
            .orchestrator
            .set(Arc::downgrade(&orchestrator))
            .unwrap();

        orchestrator
            .select_file(declared_file("photo.jpg", "image/jpeg", 1000))
            .unwrap();
        let err = orchestrator.start().await.unwrap_err();

        assert!(matches!(err, PipelineError::Superseded));
        assert!(source.calls().is_empty());
        assert_eq!(orchestrator.snapshot().state, RunState::Idle);
    }

    #[test]
    fn test_estimated_processing_time() {
        let h = happy(ScriptedVariantSource::failing());
        assert_eq!(h.orchestrator.estimated_processing_time(500 * 1000), ms(2000));
        assert_eq!(h.orchestrator.estimated_processing_time(20 * MB), ms(6000));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = PipelineError::from(NetworkError::UploadFailed {
            source: anyhow::anyhow!("403 Forbidden"),
        });
        assert_eq!(error_chain(&err), "403 Forbidden");
    }
}
