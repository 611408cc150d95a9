//! Tests for the render coordinator's fallback behavior.

use axum::{
    http::{header, StatusCode},
    routing::post,
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storyreel_adapters::{RenderWorkerClient, RenderWorkerConfig};
use storyreel_core::StorySpec;
use storyreel_error::{RenderError, RenderErrorKind, StoryreelResult};
use storyreel_render::{LocalRenderer, RenderCoordinator};
use tempfile::TempDir;

fn spec(ids: &[u32]) -> StorySpec {
    let scenes: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "goal": "feel ready",
                "script": "I will meet my teacher.",
                "on_screen_text": format!("Scene {id}"),
                "image_prompt": "a friendly classroom",
                "duration_sec": 7,
                "audio_ssml": "<speak>I will meet my teacher.</speak>"
            })
        })
        .collect();
    serde_json::from_value(serde_json::json!({
        "meta": {"title": "First Day"},
        "scenes": scenes,
        "closing_affirmation": "I can do this!"
    }))
    .unwrap()
}

fn write_assets(workdir: &Path, ids: &[u32]) {
    for id in ids {
        std::fs::write(workdir.join(format!("scene_{id}.png")), vec![1u8; 64]).unwrap();
        std::fs::write(workdir.join(format!("scene_{id}.mp3")), vec![2u8; 64]).unwrap();
    }
}

/// Fake local strategy that records invocations and the scene order it saw.
struct FakeLocal {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeLocal {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }
}

#[async_trait::async_trait]
impl LocalRenderer for FakeLocal {
    async fn render(
        &self,
        spec: &StorySpec,
        workdir: &Path,
        _srt_path: &Path,
    ) -> StoryreelResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(RenderError::new(RenderErrorKind::Encoder(
                "fake encoder exploded".to_string(),
            )))?;
        }
        // Record the order scenes would be concatenated in.
        let order: Vec<u32> = spec.scenes_by_id().iter().map(|s| s.id).collect();
        let final_path = workdir.join("final.mp4");
        let mut body = format!("order={order:?};").into_bytes();
        body.resize(4096, 0);
        tokio::fs::write(&final_path, body).await.unwrap();
        Ok(final_path)
    }
}

async fn spawn_worker(status: StatusCode, content_type: &'static str, body_len: usize) -> String {
    let app = Router::new().route(
        "/render",
        post(move || async move {
            (status, [(header::CONTENT_TYPE, content_type)], vec![7u8; body_len])
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn worker_client(url: Option<String>) -> RenderWorkerClient {
    RenderWorkerClient::new(RenderWorkerConfig {
        worker_url: url,
        timeout_secs: 5,
    })
}

#[tokio::test]
async fn remote_success_skips_local() {
    let workdir = TempDir::new().unwrap();
    let ids = [1, 2];
    write_assets(workdir.path(), &ids);

    let url = spawn_worker(StatusCode::OK, "video/mp4", 3 * 1024 * 1024).await;
    let local = FakeLocal::new(false);
    let coordinator = RenderCoordinator::new(worker_client(Some(url)), Arc::clone(&local) as _);

    let final_path = coordinator.render(&spec(&ids), workdir.path()).await.unwrap();
    assert_eq!(
        std::fs::metadata(&final_path).unwrap().len(),
        3 * 1024 * 1024
    );
    assert_eq!(local.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remote_500_falls_back_to_local_exactly_once() {
    let workdir = TempDir::new().unwrap();
    let ids = [1, 2];
    write_assets(workdir.path(), &ids);

    let url = spawn_worker(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", 16).await;
    let local = FakeLocal::new(false);
    let coordinator = RenderCoordinator::new(worker_client(Some(url)), Arc::clone(&local) as _);

    let final_path = coordinator.render(&spec(&ids), workdir.path()).await.unwrap();
    assert!(final_path.exists());
    assert_eq!(local.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tiny_remote_body_triggers_fallback() {
    let workdir = TempDir::new().unwrap();
    let ids = [1];
    write_assets(workdir.path(), &ids);

    // 200 OK but under the corruption threshold: treated like a failure.
    let url = spawn_worker(StatusCode::OK, "video/mp4", 512).await;
    let local = FakeLocal::new(false);
    let coordinator = RenderCoordinator::new(worker_client(Some(url)), Arc::clone(&local) as _);

    coordinator.render(&spec(&ids), workdir.path()).await.unwrap();
    assert_eq!(local.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn local_failure_is_fatal() {
    let workdir = TempDir::new().unwrap();
    let ids = [1];
    write_assets(workdir.path(), &ids);

    let local = FakeLocal::new(true);
    let coordinator = RenderCoordinator::new(worker_client(None), local as _);

    let err = coordinator.render(&spec(&ids), workdir.path()).await.unwrap_err();
    assert!(format!("{err}").contains("fake encoder exploded"));
}

#[tokio::test]
async fn scene_order_is_ascending_regardless_of_spec_order() {
    let workdir = TempDir::new().unwrap();
    let ids = [3, 1, 2];
    write_assets(workdir.path(), &ids);

    let local = FakeLocal::new(false);
    let coordinator = RenderCoordinator::new(worker_client(None), Arc::clone(&local) as _);

    let final_path = coordinator.render(&spec(&ids), workdir.path()).await.unwrap();
    let body = std::fs::read(&final_path).unwrap();
    let head = String::from_utf8_lossy(&body[..32]).to_string();
    assert!(head.starts_with("order=[1, 2, 3];"));
}

#[tokio::test]
async fn srt_is_written_with_cumulative_timestamps() {
    let workdir = TempDir::new().unwrap();
    let ids = [1, 2];
    write_assets(workdir.path(), &ids);

    let local = FakeLocal::new(false);
    let coordinator = RenderCoordinator::new(worker_client(None), local as _);
    coordinator.render(&spec(&ids), workdir.path()).await.unwrap();

    let srt = std::fs::read_to_string(workdir.path().join("story.srt")).unwrap();
    assert!(srt.contains("00:00:00,000 --> 00:00:07,000"));
    assert!(srt.contains("00:00:07,000 --> 00:00:14,000"));
    assert!(srt.contains("Scene 1"));
}
