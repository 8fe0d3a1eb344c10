//! The structured outcome returned to the host for every invocation.

use std::fmt::Display;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Message attached to every completed job.
pub const COMPLETED_MESSAGE: &str = "Video generated successfully";

/// Outcome of one job, serialized with a `status` discriminator.
///
/// ```json
/// {"status": "completed", "output_path": "...", "face_detected": true, "file_size": 1024, "message": "..."}
/// {"status": "failed", "error": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobResult {
    Completed {
        output_path: String,
        face_detected: bool,
        file_size: u64,
        message: String,
    },
    Failed {
        error: String,
    },
}

impl JobResult {
    pub fn completed(output_path: &Path, file_size: u64, face_detected: bool) -> Self {
        Self::Completed {
            output_path: output_path.display().to_string(),
            face_detected,
            file_size,
            message: COMPLETED_MESSAGE.to_string(),
        }
    }

    pub fn failed(error: impl Display) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Wire value of the `status` field.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}
