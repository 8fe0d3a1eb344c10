use std::sync::Arc;

use facecast_pipeline::Orchestrator;
use tokio::sync::Mutex;

/// Shared state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Held for the duration of a job. The engine serves one job at a time.
    pub job_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            job_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Whether a job is currently running.
    pub fn is_busy(&self) -> bool {
        self.job_lock.try_lock().is_err()
    }
}
