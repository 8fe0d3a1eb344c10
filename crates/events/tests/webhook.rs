//! Integration tests for webhook delivery against a mock endpoint.

use std::time::Duration;

use facecast_core::{DeliveryTarget, JobResult};
use facecast_events::{WebhookDelivery, WebhookError, WebhookPayload};
use httpmock::prelude::*;
use serde_json::json;

fn target(server: &MockServer, api_key: Option<&str>) -> DeliveryTarget {
    DeliveryTarget {
        url: server.url("/api/webhook/video-complete"),
        job_id: "job_123".into(),
        api_key: api_key.map(str::to_string),
    }
}

fn delivery() -> WebhookDelivery {
    WebhookDelivery::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn failure_notification_sends_bearer_and_body() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/webhook/video-complete")
            .header("authorization", "Bearer secret")
            .json_body(json!({
                "job_id": "job_123",
                "status": "failed",
                "error": "No face detected in the image",
            }));
        then.status(200);
    });

    let result = JobResult::failed("No face detected in the image");
    delivery()
        .deliver(
            &target(&server, Some("secret")),
            &WebhookPayload::new("job_123", &result),
        )
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn missing_api_key_still_sends_authorization() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/webhook/video-complete")
            .header_exists("authorization");
        then.status(204);
    });

    let result = JobResult::failed("boom");
    delivery()
        .deliver(&target(&server, None), &WebhookPayload::new("job_123", &result))
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/webhook/video-complete");
        then.status(500);
    });

    let result = JobResult::failed("boom");
    let err = delivery()
        .deliver(&target(&server, None), &WebhookPayload::new("job_123", &result))
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::HttpStatus(500)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_request_error() {
    let target = DeliveryTarget {
        url: "http://127.0.0.1:9/unreachable".into(),
        job_id: "job_123".into(),
        api_key: None,
    };

    let result = JobResult::failed("boom");
    let err = delivery()
        .deliver(&target, &WebhookPayload::new("job_123", &result))
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::Request(_)));
}
