//! Tests for the render worker client's failure classification.

use axum::{
    extract::Multipart,
    http::{header, StatusCode},
    routing::post,
    Router,
};
use storyreel_adapters::{
    RenderUpload, RenderWorkerClient, RenderWorkerConfig, SceneUpload, MIN_ARTIFACT_BYTES,
};
use storyreel_error::{RenderErrorKind, StoryreelErrorKind};

fn upload() -> RenderUpload {
    RenderUpload {
        srt: b"1\n00:00:00,000 --> 00:00:07,000\nMeeting my teacher\n".to_vec(),
        scenes: vec![
            SceneUpload {
                id: 1,
                duration_sec: 7,
                image: vec![1u8; 64],
                audio: vec![2u8; 64],
            },
            SceneUpload {
                id: 2,
                duration_sec: 8,
                image: vec![3u8; 64],
                audio: vec![4u8; 64],
            },
        ],
    }
}

async fn spawn_worker(status: StatusCode, content_type: &'static str, body_len: usize) -> String {
    let app = Router::new().route(
        "/render",
        post(move |_multipart: Multipart| async move {
            (
                status,
                [(header::CONTENT_TYPE, content_type)],
                vec![0u8; body_len],
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_for(worker_url: String) -> RenderWorkerClient {
    RenderWorkerClient::new(RenderWorkerConfig {
        worker_url: Some(worker_url),
        timeout_secs: 5,
    })
}

fn render_kind(err: storyreel_error::StoryreelError) -> RenderErrorKind {
    match err.kind() {
        StoryreelErrorKind::Render(render) => render.kind.clone(),
        other => panic!("unexpected error kind: {other:?}"),
    }
}

#[tokio::test]
async fn accepts_plausible_video() {
    let url = spawn_worker(StatusCode::OK, "video/mp4", 3 * 1024 * 1024).await;
    let client = client_for(url);

    let video = client.render(&upload()).await.unwrap();
    assert_eq!(video.len(), 3 * 1024 * 1024);
}

#[tokio::test]
async fn non_2xx_is_a_worker_failure() {
    let url = spawn_worker(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", 16).await;
    let client = client_for(url);

    let kind = render_kind(client.render(&upload()).await.unwrap_err());
    assert!(matches!(kind, RenderErrorKind::Worker(_)));
}

#[tokio::test]
async fn non_video_content_type_is_rejected() {
    let url = spawn_worker(StatusCode::OK, "text/html", 1024 * 1024).await;
    let client = client_for(url);

    let kind = render_kind(client.render(&upload()).await.unwrap_err());
    assert!(matches!(kind, RenderErrorKind::BadContentType(_)));
}

#[tokio::test]
async fn undersized_body_is_corrupt() {
    let url = spawn_worker(StatusCode::OK, "video/mp4", MIN_ARTIFACT_BYTES).await;
    let client = client_for(url);

    let kind = render_kind(client.render(&upload()).await.unwrap_err());
    assert!(matches!(kind, RenderErrorKind::CorruptArtifact(_)));
}

#[tokio::test]
async fn multipart_carries_manifest_and_durations() {
    use std::sync::{Arc, Mutex};

    let seen: Arc<Mutex<Vec<(String, Option<String>)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_handler = Arc::clone(&seen);
    let app = Router::new().route(
        "/render",
        post(move |mut multipart: Multipart| {
            let seen = Arc::clone(&seen_handler);
            async move {
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    let filename = field.file_name().map(str::to_string);
                    let _ = field.bytes().await.unwrap();
                    seen.lock().unwrap().push((name, filename));
                }
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "video/mp4")],
                    vec![0u8; 4096],
                )
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = client_for(format!("http://{addr}"));
    client.render(&upload()).await.unwrap();

    let fields = seen.lock().unwrap().clone();
    let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
    assert!(names.contains(&"subs"));
    assert!(names.contains(&"manifest"));
    assert!(names.contains(&"scenes"));
    let filenames: Vec<String> = fields.iter().filter_map(|(_, f)| f.clone()).collect();
    assert!(filenames.contains(&"scene_1.png".to_string()));
    assert!(filenames.contains(&"scene_2.mp3".to_string()));
}
