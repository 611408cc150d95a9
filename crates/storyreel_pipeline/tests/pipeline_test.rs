//! End-to-end pipeline tests with mock adapters.

use async_trait::async_trait;
use axum::{
    http::{header, StatusCode},
    routing::post,
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storyreel_adapters::{
    ImageGenerator, RenderWorkerClient, RenderWorkerConfig, SpeechSynthesizer, StorySpecGenerator,
};
use storyreel_core::{JobPatch, JobRecord, JobStatus, StoryRequest, StorySpec};
use storyreel_error::{
    PipelineErrorKind, StoreError, StoreErrorKind, StoryreelErrorKind, StoryreelResult,
    UpstreamError, UpstreamErrorKind,
};
use storyreel_pipeline::{AssetAssembler, ExecutionMode, Orchestrator, PipelineConfig};
use storyreel_render::{LocalRenderer, RenderCoordinator};
use storyreel_store::{JobStore, MemoryJobStore};
use tempfile::TempDir;

fn request() -> StoryRequest {
    serde_json::from_value(serde_json::json!({
        "situation": "first day of school",
        "setting": "a kindergarten classroom"
    }))
    .unwrap()
}

/// Spec generator returning a fixed number of two-second scenes.
struct MockSpecGen {
    scenes: u32,
}

#[async_trait]
impl StorySpecGenerator for MockSpecGen {
    async fn generate_spec(&self, _request: &StoryRequest) -> StoryreelResult<StorySpec> {
        let scenes: Vec<serde_json::Value> = (1..=self.scenes)
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "goal": "feel ready",
                    "script": format!("Scene {id} script."),
                    "on_screen_text": format!("Scene {id}"),
                    "image_prompt": format!("prompt-{id}"),
                    "duration_sec": 2,
                    "audio_ssml": format!("<speak>Scene {id} script.</speak>")
                })
            })
            .collect();
        Ok(serde_json::from_value(serde_json::json!({
            "meta": {"title": "First Day"},
            "scenes": scenes,
            "closing_affirmation": "I can do this!"
        }))
        .unwrap())
    }
}

/// Image generator that can be told to fail on one scene's prompt.
struct MockImages {
    fail_prompt: Option<String>,
    calls: AtomicUsize,
}

impl MockImages {
    fn new(fail_scene: Option<u32>) -> Arc<Self> {
        Arc::new(Self {
            fail_prompt: fail_scene.map(|id| format!("prompt-{id}")),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ImageGenerator for MockImages {
    async fn generate_png(&self, prompt: &str) -> StoryreelResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_prompt.as_deref() == Some(prompt) {
            Err(UpstreamError::new(UpstreamErrorKind::Generation(
                "prediction reached failed state".to_string(),
            )))?;
        }
        Ok(vec![0x89u8; 256])
    }
}

struct MockSpeech;

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, _text: &str) -> StoryreelResult<Vec<u8>> {
        Ok(vec![0xffu8; 256])
    }
}

/// Local renderer that records invocations and writes a recognizable body.
struct StubLocal {
    calls: AtomicUsize,
}

impl StubLocal {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LocalRenderer for StubLocal {
    async fn render(
        &self,
        _spec: &StorySpec,
        workdir: &Path,
        _srt_path: &Path,
    ) -> StoryreelResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let final_path = workdir.join("final.mp4");
        let mut body = b"local-render;".to_vec();
        body.resize(4096, 7);
        tokio::fs::write(&final_path, body).await.unwrap();
        Ok(final_path)
    }
}

struct Harness {
    orchestrator: Orchestrator,
    store: Arc<dyn JobStore>,
    images: Arc<MockImages>,
    local: Arc<StubLocal>,
    _root: TempDir,
}

fn harness(
    mode: ExecutionMode,
    scenes: u32,
    fail_scene: Option<u32>,
    worker_url: Option<String>,
) -> Harness {
    harness_with_delay(mode, scenes, fail_scene, worker_url, Duration::ZERO)
}

fn harness_with_delay(
    mode: ExecutionMode,
    scenes: u32,
    fail_scene: Option<u32>,
    worker_url: Option<String>,
    scene_delay: Duration,
) -> Harness {
    let root = TempDir::new().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let images = MockImages::new(fail_scene);
    let local = StubLocal::new();

    let assembler = AssetAssembler::new(
        Arc::clone(&images) as _,
        Arc::new(MockSpeech) as _,
        1,
        scene_delay,
    );
    let worker = RenderWorkerClient::new(RenderWorkerConfig {
        worker_url,
        timeout_secs: 5,
    });
    let renderer = Arc::new(RenderCoordinator::new(worker, Arc::clone(&local) as _));
    let config = PipelineConfig {
        execution_mode: mode,
        scene_concurrency: 1,
        scene_delay_ms: 0,
        workdir_root: root.path().to_path_buf(),
    };
    let orchestrator = Orchestrator::new(
        Arc::clone(&store),
        Arc::new(MockSpecGen { scenes }),
        assembler,
        renderer,
        config,
    );
    Harness {
        orchestrator,
        store,
        images,
        local,
        _root: root,
    }
}

async fn wait_terminal(orchestrator: &Orchestrator, job_id: &str) -> JobRecord {
    for _ in 0..500 {
        let record = orchestrator.status(job_id).await.unwrap();
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

#[tokio::test]
async fn async_submit_returns_queued_then_succeeds() {
    let h = harness(ExecutionMode::Async, 3, None, None);

    let accepted = h.orchestrator.submit(request()).await.unwrap();
    assert_eq!(accepted.status, JobStatus::Queued);
    assert_eq!(accepted.progress.scenes_completed, 0);

    let record = wait_terminal(&h.orchestrator, &accepted.job_id).await;
    assert_eq!(record.status, JobStatus::Succeeded);
    assert_eq!(record.progress.current_step, "done");
    assert_eq!(record.progress.scenes_completed, 3);
    assert_eq!(record.progress.total_scenes, 3);
    assert!(record.error.is_none());
    assert_eq!(record.spec.unwrap().scenes.len(), 3);
    assert_eq!(h.images.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn polled_progress_is_monotonic() {
    // A pacing delay gives the poller a chance to observe intermediate counts.
    let h = harness_with_delay(
        ExecutionMode::Async,
        4,
        None,
        None,
        Duration::from_millis(25),
    );

    let accepted = h.orchestrator.submit(request()).await.unwrap();
    let mut last = 0u32;
    loop {
        let record = h.orchestrator.status(&accepted.job_id).await.unwrap();
        assert!(
            record.progress.scenes_completed >= last,
            "scenes_completed went backwards: {} -> {}",
            last,
            record.progress.scenes_completed
        );
        last = record.progress.scenes_completed;
        if record.status.is_terminal() {
            assert_eq!(record.status, JobStatus::Succeeded);
            assert_eq!(last, 4);
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn sync_submit_returns_terminal_record() {
    let h = harness(ExecutionMode::Sync, 2, None, None);

    let record = h.orchestrator.submit(request()).await.unwrap();
    assert_eq!(record.status, JobStatus::Succeeded);
    assert_eq!(record.progress.scenes_completed, 2);
    assert_eq!(h.local.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scene_failure_names_scene_and_cleans_workdir() {
    let h = harness(ExecutionMode::Sync, 3, Some(2), None);

    let record = h.orchestrator.submit(request()).await.unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    let error = record.error.unwrap();
    assert!(error.contains("scene 2"), "error was: {error}");
    assert!(error.contains("prediction reached failed state"));

    // Scene 1 completed before the failure; scene 3 never started.
    assert_eq!(record.progress.scenes_completed, 1);
    assert_eq!(h.images.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.local.calls.load(Ordering::SeqCst), 0);

    // Scratch space is released immediately on failure.
    let workdir = record.workdir.unwrap();
    assert!(!workdir.exists());
}

#[tokio::test]
async fn assets_are_written_per_scene() {
    let h = harness(ExecutionMode::Sync, 2, None, None);

    let record = h.orchestrator.submit(request()).await.unwrap();
    let workdir = record.workdir.unwrap();
    for id in [1, 2] {
        assert!(workdir.join(format!("scene_{id}.png")).is_file());
        assert!(workdir.join(format!("scene_{id}.mp3")).is_file());
    }
    assert!(workdir.join("story_spec.json").is_file());
    assert!(workdir.join("story.srt").is_file());
}

#[tokio::test]
async fn download_returns_bytes_then_reaps() {
    let h = harness(ExecutionMode::Sync, 2, None, None);

    let record = h.orchestrator.submit(request()).await.unwrap();
    let job_id = record.job_id.clone();
    let workdir = record.workdir.clone().unwrap();

    let (bytes, filename) = h.orchestrator.download(&job_id).await.unwrap();
    assert_eq!(filename, format!("social-story-{job_id}.mp4"));
    assert_eq!(bytes.len(), 4096);
    assert!(bytes.starts_with(b"local-render;"));

    // Workdir and record are gone; a second download reports not-found.
    assert!(!workdir.exists());
    assert!(h.store.get(&job_id).await.unwrap().is_none());
    let err = h.orchestrator.download(&job_id).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        StoryreelErrorKind::Pipeline(e) if matches!(e.kind, PipelineErrorKind::NotFound(_))
    ));
}

#[tokio::test]
async fn download_before_success_is_a_conflict() {
    let h = harness(ExecutionMode::Sync, 3, Some(2), None);

    let record = h.orchestrator.submit(request()).await.unwrap();
    assert_eq!(record.status, JobStatus::Failed);

    let err = h.orchestrator.download(&record.job_id).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        StoryreelErrorKind::Pipeline(e) if matches!(e.kind, PipelineErrorKind::NotReady(_))
    ));
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let h = harness(ExecutionMode::Sync, 1, None, None);
    let err = h.orchestrator.status("no-such-job").await.unwrap_err();
    assert!(matches!(
        err.kind(),
        StoryreelErrorKind::Pipeline(e) if matches!(e.kind, PipelineErrorKind::NotFound(_))
    ));
}

#[tokio::test]
async fn invalid_request_is_rejected_before_any_work() {
    let h = harness(ExecutionMode::Sync, 1, None, None);
    let bad: StoryRequest =
        serde_json::from_value(serde_json::json!({"situation": "", "setting": "home"})).unwrap();

    let err = h.orchestrator.submit(bad).await.unwrap_err();
    assert!(matches!(err.kind(), StoryreelErrorKind::Validation(_)));
    assert_eq!(h.images.calls.load(Ordering::SeqCst), 0);
}

/// Store whose next update for a chosen step fails once, then recovers.
struct FailingUpdateStore {
    inner: MemoryJobStore,
    fail_step: &'static str,
    armed: AtomicBool,
}

impl FailingUpdateStore {
    fn new(fail_step: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryJobStore::new(),
            fail_step,
            armed: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl JobStore for FailingUpdateStore {
    async fn create(&self, record: JobRecord) -> StoryreelResult<()> {
        self.inner.create(record).await
    }

    async fn get(&self, job_id: &str) -> StoryreelResult<Option<JobRecord>> {
        self.inner.get(job_id).await
    }

    async fn update(&self, job_id: &str, patch: JobPatch) -> StoryreelResult<bool> {
        if patch.current_step.as_deref() == Some(self.fail_step)
            && self.armed.swap(false, Ordering::SeqCst)
        {
            Err(StoreError::new(StoreErrorKind::Http(
                "kv write failed: 503".to_string(),
            )))?;
        }
        self.inner.update(job_id, patch).await
    }

    async fn increment_scenes_completed(&self, job_id: &str) -> StoryreelResult<u32> {
        self.inner.increment_scenes_completed(job_id).await
    }

    async fn remove(&self, job_id: &str) -> StoryreelResult<()> {
        self.inner.remove(job_id).await
    }
}

#[tokio::test]
async fn store_fault_mid_run_fails_job_and_cleans_workdir() {
    let root = TempDir::new().unwrap();
    let store = FailingUpdateStore::new("render");
    let images = MockImages::new(None);
    let local = StubLocal::new();

    let assembler = AssetAssembler::new(
        Arc::clone(&images) as _,
        Arc::new(MockSpeech) as _,
        1,
        Duration::ZERO,
    );
    let worker = RenderWorkerClient::new(RenderWorkerConfig {
        worker_url: None,
        timeout_secs: 5,
    });
    let renderer = Arc::new(RenderCoordinator::new(worker, Arc::clone(&local) as _));
    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as _,
        Arc::new(MockSpecGen { scenes: 2 }),
        assembler,
        renderer,
        PipelineConfig {
            execution_mode: ExecutionMode::Sync,
            scene_concurrency: 1,
            scene_delay_ms: 0,
            workdir_root: root.path().to_path_buf(),
        },
    );

    let record = orchestrator.submit(request()).await.unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    let error = record.error.unwrap();
    assert!(error.contains("503"), "error was: {error}");

    // The render stage was never reached and the scratch space is gone.
    assert_eq!(local.calls.load(Ordering::SeqCst), 0);
    let workdir = record.workdir.unwrap();
    assert!(!workdir.exists());
}

#[tokio::test]
async fn remote_render_worker_supplies_final_video() {
    let video = vec![0x42u8; 3 * 1024 * 1024];
    let body = video.clone();
    let app = Router::new().route(
        "/render",
        post(move || {
            let body = body.clone();
            async move { (StatusCode::OK, [(header::CONTENT_TYPE, "video/mp4")], body) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let h = harness(ExecutionMode::Sync, 6, None, Some(format!("http://{addr}")));
    let record = h.orchestrator.submit(request()).await.unwrap();
    assert_eq!(record.status, JobStatus::Succeeded);
    assert_eq!(h.local.calls.load(Ordering::SeqCst), 0);

    let (bytes, _filename) = h.orchestrator.download(&record.job_id).await.unwrap();
    assert_eq!(bytes, video);
}
