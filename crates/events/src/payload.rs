//! Notification body sent to a job's delivery target.
//!
//! The body mirrors the [`JobResult`] returned to the host and adds the
//! delivery `job_id`. Completed jobs may also carry the artifact itself
//! (inline mode) or a public link to it (reference mode).

use facecast_core::JobResult;
use serde::Serialize;

/// Artifact details attached to a completion notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArtifactAttachment {
    /// The artifact bytes, base64 encoded.
    Inline {
        video_base64: String,
        metadata: ArtifactMetadata,
    },
    /// Where the artifact can be fetched from.
    Reference { video_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMetadata {
    pub file_size: u64,
    pub path: String,
}

/// JSON body of a delivery POST.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub job_id: &'a str,
    #[serde(flatten)]
    pub result: &'a JobResult,
    #[serde(flatten)]
    pub artifact: Option<ArtifactAttachment>,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(job_id: &'a str, result: &'a JobResult) -> Self {
        Self {
            job_id,
            result,
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: ArtifactAttachment) -> Self {
        self.artifact = Some(artifact);
        self
    }
}
