//! Lifecycle tests: one runner task per job against a scripted engine,
//! observed only through the job store, ending with one-shot delivery.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedEngine, Step};
use mds_core::deliver::{self, DeliverError};
use mds_core::fetch::FetchEngine;
use mds_core::job::{DownloadRequest, JobStatus, JobStore, MediaKind};
use mds_core::retry::RetryPolicy;
use mds_core::runner::{self, RunnerSettings};
use tempfile::tempdir;
use tokio::io::AsyncReadExt;

fn video_request(filename: Option<&str>) -> DownloadRequest {
    DownloadRequest {
        url: "https://example/video".to_string(),
        kind: MediaKind::Video,
        resolution: Some(720),
        filename: filename.map(str::to_string),
    }
}

fn settings(dir: &std::path::Path) -> RunnerSettings {
    RunnerSettings {
        download_dir: dir.to_path_buf(),
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
        },
    }
}

async fn run_to_completion(
    store: &Arc<JobStore>,
    engine: Arc<dyn FetchEngine>,
    settings: RunnerSettings,
    request: DownloadRequest,
) -> mds_core::job::JobId {
    let id = store.allocate(request);
    runner::spawn(Arc::clone(store), engine, settings, id)
        .await
        .expect("runner task join");
    id
}

#[tokio::test]
async fn successful_video_job_completes_and_delivers_once() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JobStore::new());
    let engine = Arc::new(ScriptedEngine::new(vec![Step::Succeed {
        title: Some("Some Upstream Title"),
        progress: vec![10.0, 55.5, 99.9],
        write_file: true,
    }]));

    let id = run_to_completion(
        &store,
        engine,
        settings(dir.path()),
        video_request(Some("clip")),
    )
    .await;

    let snap = store.get(id).unwrap();
    assert_eq!(snap.status, JobStatus::Completed);
    assert_eq!(snap.progress, 100.0);
    assert_eq!(snap.display_name.as_deref(), Some("clip.mp4"));
    let result_path = snap.result_path.expect("result path set");
    assert_eq!(result_path, dir.path().join(format!("{id}.mp4")));
    assert!(result_path.exists());

    // First delivery streams the bytes and removes the file.
    let mut delivery = deliver::claim(&store, id).await.unwrap();
    assert_eq!(delivery.display_name, "clip.mp4");
    let mut body = Vec::new();
    delivery.file.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"artifact");
    assert!(!result_path.exists());

    // Second delivery observes gone, never stale content.
    assert_eq!(deliver::claim(&store, id).await.unwrap_err(), DeliverError::Gone);
}

#[tokio::test]
async fn audio_display_name_derives_from_title() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JobStore::new());
    let engine = Arc::new(ScriptedEngine::new(vec![Step::Succeed {
        title: Some("My Song"),
        progress: vec![100.0],
        write_file: true,
    }]));

    let request = DownloadRequest {
        url: "https://example/audio".to_string(),
        kind: MediaKind::Audio,
        resolution: None,
        filename: None,
    };
    let id = run_to_completion(&store, engine, settings(dir.path()), request).await;

    let snap = store.get(id).unwrap();
    assert_eq!(snap.status, JobStatus::Completed);
    assert_eq!(snap.display_name.as_deref(), Some("My_Song.mp3"));
    assert_eq!(snap.result_path, Some(dir.path().join(format!("{id}.mp3"))));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_twice_then_success_completes_within_budget() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JobStore::new());
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::RateLimited("HTTP Error 429: Too Many Requests"),
        Step::RateLimited("HTTP Error 429: Too Many Requests"),
        Step::Succeed {
            title: None,
            progress: vec![100.0],
            write_file: true,
        },
    ]));

    let id = run_to_completion(
        &store,
        Arc::clone(&engine) as Arc<dyn FetchEngine>,
        settings(dir.path()),
        video_request(None),
    )
    .await;

    assert_eq!(engine.attempts(), 3);
    assert_eq!(store.get(id).unwrap().status, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_exhaustion_errors_with_cause() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JobStore::new());
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::RateLimited("HTTP Error 429: Too Many Requests"),
        Step::RateLimited("HTTP Error 429: Too Many Requests"),
        Step::RateLimited("HTTP Error 429: Too Many Requests"),
    ]));

    let id = run_to_completion(
        &store,
        Arc::clone(&engine) as Arc<dyn FetchEngine>,
        settings(dir.path()),
        video_request(None),
    )
    .await;

    assert_eq!(engine.attempts(), 3, "no attempts beyond the retry budget");
    let snap = store.get(id).unwrap();
    assert_eq!(snap.status, JobStatus::Error);
    let detail = snap.error.expect("error detail set");
    assert!(detail.contains("429"), "cause preserved: {detail}");
    assert!(snap.result_path.is_none());
}

#[tokio::test]
async fn non_retryable_failure_is_terminal_immediately() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JobStore::new());
    let engine = Arc::new(ScriptedEngine::new(vec![Step::Fail("Video unavailable")]));

    let id = run_to_completion(
        &store,
        Arc::clone(&engine) as Arc<dyn FetchEngine>,
        settings(dir.path()),
        video_request(None),
    )
    .await;

    assert_eq!(engine.attempts(), 1);
    let snap = store.get(id).unwrap();
    assert_eq!(snap.status, JobStatus::Error);
    assert!(snap.error.unwrap().contains("Video unavailable"));
}

#[tokio::test]
async fn missing_output_after_engine_success_is_an_error() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JobStore::new());
    let engine = Arc::new(ScriptedEngine::new(vec![Step::Succeed {
        title: None,
        progress: vec![100.0],
        write_file: false,
    }]));

    let id = run_to_completion(&store, engine, settings(dir.path()), video_request(None)).await;

    let snap = store.get(id).unwrap();
    assert_eq!(snap.status, JobStatus::Error);
    assert!(snap.error.unwrap().contains("result file missing"));
    assert!(snap.result_path.is_none());
}

#[tokio::test]
async fn progress_is_clamped_and_non_decreasing() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JobStore::new());
    // Out-of-order and out-of-range samples must not crash the job or move
    // the display value backwards.
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Succeed {
            title: None,
            progress: vec![50.0, 30.0, -5.0],
            write_file: false,
        },
    ]));

    let id = run_to_completion(&store, engine, settings(dir.path()), video_request(None)).await;

    // Finalization failed (no file), but the display value never moved
    // backwards before the terminal transition.
    let snap = store.get(id).unwrap();
    assert_eq!(snap.status, JobStatus::Error);
    assert_eq!(snap.progress, 100.0, "finished fetch pins progress at 100");
}
