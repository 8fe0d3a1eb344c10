//! Synchronous job invocation.
//!
//! `POST /runsync` takes an invocation event, runs it to completion while
//! holding the job lock, and answers with the job result wrapped in the
//! host envelope:
//!
//! ```json
//! {"id": "...", "status": "COMPLETED", "output": {"status": "completed", ...}}
//! ```
//!
//! The envelope status reports that the invocation ran; whether the job
//! succeeded is in `output.status`.
//!
//! The job runs in its own task. If the request is dropped (request timeout
//! or client disconnect) the job still finishes, reaps its files and notifies
//! its webhook, and the job lock is held until it does.

use std::sync::Arc;

use axum::extract::State;
use axum::{routing::post, Json, Router};
use facecast_core::JobResult;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::state::AppState;

/// Envelope status of an invocation that ran to the end.
pub const INVOCATION_COMPLETED: &str = "COMPLETED";

#[derive(Debug, Serialize)]
pub struct RunSyncResponse {
    pub id: String,
    pub status: &'static str,
    pub output: JobResult,
}

/// POST /runsync
async fn run_sync(State(state): State<AppState>, Json(mut event): Json<Value>) -> Json<RunSyncResponse> {
    let id = invocation_id(&mut event);

    let guard = Arc::clone(&state.job_lock).lock_owned().await;
    tracing::info!(invocation_id = %id, "Invocation started");
    let orchestrator = Arc::clone(&state.orchestrator);
    let job = tokio::spawn(
        async move {
            let _guard = guard;
            orchestrator.handle(event).await
        }
        .in_current_span(),
    );
    let output = job.await.unwrap_or_else(|e| {
        tracing::error!(invocation_id = %id, error = %e, "Job task did not complete");
        JobResult::failed(format!("Job aborted: {e}"))
    });

    Json(RunSyncResponse {
        id,
        status: INVOCATION_COMPLETED,
        output,
    })
}

/// The event's `id`, assigned here when the caller sent none so the job can
/// fall back to it.
fn invocation_id(event: &mut Value) -> String {
    if let Some(id) = event.get("id").and_then(Value::as_str) {
        return id.to_string();
    }
    let id = format!("sync-{}", uuid::Uuid::new_v4());
    if let Value::Object(map) = event {
        map.insert("id".into(), Value::String(id.clone()));
    }
    id
}

pub fn router() -> Router<AppState> {
    Router::new().route("/runsync", post(run_sync))
}
