//! Integration tests for the HTTP host surface and one-shot mode.

mod common;

use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use axum::http::StatusCode;
use base64::{engine::general_purpose, Engine as _};
use common::{
    body_json, build_test_app, get, orchestrator_with, post_json, test_orchestrator, SlowEngine,
};
use facecast_core::JobResult;
use facecast_worker::config::ServerConfig;
use facecast_worker::router::build_app;
use facecast_worker::state::AppState;
use facecast_worker::oneshot::{run_file, OneshotError};
use serde_json::json;

fn inline_input(job_id: &str) -> serde_json::Value {
    json!({
        "job_id": job_id,
        "image_base64": general_purpose::STANDARD.encode([1u8; 16]),
        "audio_base64": general_purpose::STANDARD.encode([2u8; 16]),
    })
}

// ---------------------------------------------------------------------------
// Test: GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_reports_idle_worker() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let app = build_test_app(test_orchestrator(temp.path(), output.path()));

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["busy"], false);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let app = build_test_app(test_orchestrator(temp.path(), output.path()));

    let response = get(app, "/run").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: POST /runsync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn runsync_wraps_a_completed_job() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let app = build_test_app(test_orchestrator(temp.path(), output.path()));

    let response = post_json(
        app,
        "/runsync",
        json!({ "id": "inv-1", "input": inline_input("job_http") }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["id"], "inv-1");
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["output"]["status"], "completed");
    assert_eq!(json["output"]["face_detected"], true);
    assert!(json["output"]["output_path"]
        .as_str()
        .unwrap()
        .ends_with("output_job_http.mp4"));
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn runsync_returns_failed_jobs_in_the_envelope() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let app = build_test_app(test_orchestrator(temp.path(), output.path()));

    let response = post_json(app, "/runsync", json!({ "input": { "crop": true } })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["id"].as_str().unwrap().starts_with("sync-"));
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["output"]["status"], "failed");
    assert!(json["output"]["error"]
        .as_str()
        .unwrap()
        .starts_with("Missing input data"));
}

#[tokio::test]
async fn invocation_id_becomes_the_job_id() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let app = build_test_app(test_orchestrator(temp.path(), output.path()));

    let mut input = inline_input("ignored");
    input.as_object_mut().unwrap().remove("job_id");

    let json = body_json(post_json(app, "/runsync", json!({ "id": "inv-42", "input": input })).await).await;
    assert!(json["output"]["output_path"]
        .as_str()
        .unwrap()
        .ends_with("output_inv-42.mp4"));
}

#[tokio::test]
async fn timed_out_request_still_finishes_and_cleans_up_its_job() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator_with(
        temp.path(),
        output.path(),
        std::sync::Arc::new(SlowEngine(Duration::from_secs(3))),
    );
    let state = AppState::new(orchestrator);
    let config = ServerConfig {
        request_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let app = build_app(state.clone(), &config);

    let response = post_json(
        app,
        "/runsync",
        json!({ "id": "inv-slow", "input": inline_input("slow_1") }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(state.is_busy(), "job should keep running after the timeout");

    let deadline = Instant::now() + Duration::from_secs(10);
    while state.is_busy() {
        assert!(Instant::now() < deadline, "job never finished");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    assert!(output.path().join("output_slow_1.mp4").exists());
}

// ---------------------------------------------------------------------------
// Test: one-shot mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oneshot_runs_the_event_file() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let orchestrator = test_orchestrator(temp.path(), output.path());

    let event_file = output.path().join("test_input.json");
    std::fs::write(
        &event_file,
        serde_json::to_vec(&json!({ "input": inline_input("job_file") })).unwrap(),
    )
    .unwrap();

    let result = run_file(&orchestrator, &event_file).await.unwrap();
    assert_matches!(result, JobResult::Completed { face_detected: true, .. });
}

#[tokio::test]
async fn oneshot_rejects_invalid_json() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let orchestrator = test_orchestrator(temp.path(), output.path());

    let event_file = temp.path().join("broken.json");
    std::fs::write(&event_file, b"{ not json").unwrap();

    assert_matches!(
        run_file(&orchestrator, &event_file).await,
        Err(OneshotError::Parse { .. })
    );
}

#[tokio::test]
async fn oneshot_reports_missing_file() {
    let temp = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let orchestrator = test_orchestrator(temp.path(), output.path());

    assert_matches!(
        run_file(&orchestrator, &temp.path().join("absent.json")).await,
        Err(OneshotError::Read { .. })
    );
}
