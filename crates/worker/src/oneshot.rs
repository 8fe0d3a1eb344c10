//! One-shot mode: run the event stored in a file and report its result.

use std::path::{Path, PathBuf};

use facecast_core::JobResult;
use facecast_pipeline::Orchestrator;

#[derive(Debug, thiserror::Error)]
pub enum OneshotError {
    #[error("Failed to read test input {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Test input {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load the event at `path` and run it.
pub async fn run_file(orchestrator: &Orchestrator, path: &Path) -> Result<JobResult, OneshotError> {
    let raw = tokio::fs::read(path).await.map_err(|source| OneshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let event = serde_json::from_slice(&raw).map_err(|source| OneshotError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Running test input");
    Ok(orchestrator.handle(event).await)
}
