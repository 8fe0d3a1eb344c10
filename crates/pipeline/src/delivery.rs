//! Outcome notifications to the caller's webhook.
//!
//! Delivery never changes a job's result: a completed job whose
//! notification fails is still completed, and a failure notification that
//! cannot be sent is only logged.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use facecast_core::{DeliveryMode, DeliveryTarget, JobResult, PipelineConfig};
use facecast_events::{ArtifactAttachment, ArtifactMetadata, WebhookDelivery, WebhookPayload};

use crate::error::SetupError;
use crate::generate::Artifact;

/// Sends job outcomes to delivery targets according to the configured mode.
#[derive(Debug, Clone)]
pub struct ResultNotifier {
    webhook: WebhookDelivery,
    mode: DeliveryMode,
    artifact_base_url: Option<String>,
}

impl ResultNotifier {
    pub fn new(config: &PipelineConfig) -> Result<Self, SetupError> {
        Ok(Self {
            webhook: WebhookDelivery::new(config.webhook_timeout)?,
            mode: config.delivery_mode,
            artifact_base_url: config.artifact_base_url.clone(),
        })
    }

    /// Notify a completed job. Returns whether the target acknowledged it.
    pub async fn notify_completed(
        &self,
        target: &DeliveryTarget,
        result: &JobResult,
        artifact: &Artifact,
    ) -> bool {
        let attachment = match self.attachment(artifact).await {
            Ok(attachment) => attachment,
            Err(e) => {
                tracing::warn!(
                    path = %artifact.path.display(),
                    error = %e,
                    "Failed to read artifact for delivery",
                );
                None
            }
        };

        let mut payload = WebhookPayload::new(&target.job_id, result);
        if let Some(attachment) = attachment {
            payload = payload.with_artifact(attachment);
        }

        match self.webhook.deliver(target, &payload).await {
            Ok(()) => {
                tracing::info!(url = %target.url, job_id = %target.job_id, "Completion webhook delivered");
                true
            }
            Err(e) => {
                tracing::warn!(
                    url = %target.url,
                    job_id = %target.job_id,
                    error = %e,
                    "Completion webhook failed",
                );
                false
            }
        }
    }

    /// Notify a failed job. Delivery errors are discarded.
    pub async fn notify_failed(&self, target: &DeliveryTarget, result: &JobResult) -> bool {
        let payload = WebhookPayload::new(&target.job_id, result);
        match self.webhook.deliver(target, &payload).await {
            Ok(()) => {
                tracing::info!(url = %target.url, job_id = %target.job_id, "Failure webhook delivered");
                true
            }
            Err(e) => {
                tracing::debug!(url = %target.url, error = %e, "Failure webhook not delivered");
                false
            }
        }
    }

    async fn attachment(
        &self,
        artifact: &Artifact,
    ) -> Result<Option<ArtifactAttachment>, std::io::Error> {
        match self.mode {
            DeliveryMode::Inline => {
                let bytes = tokio::fs::read(&artifact.path).await?;
                Ok(Some(ArtifactAttachment::Inline {
                    video_base64: general_purpose::STANDARD.encode(&bytes),
                    metadata: ArtifactMetadata {
                        file_size: artifact.size,
                        path: artifact.path.display().to_string(),
                    },
                }))
            }
            DeliveryMode::Reference => Ok(self
                .artifact_base_url
                .as_deref()
                .and_then(|base| artifact_url(base, &artifact.path))
                .map(|video_url| ArtifactAttachment::Reference { video_url })),
        }
    }
}

/// Public URL of an artifact: `<base>/<file name>`.
fn artifact_url(base: &str, path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    Some(format!("{}/{}", base.trim_end_matches('/'), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_url_joins_base_and_file_name() {
        assert_eq!(
            artifact_url("https://cdn.example/videos/", Path::new("/out/output_a.mp4")).as_deref(),
            Some("https://cdn.example/videos/output_a.mp4")
        );
        assert_eq!(
            artifact_url("https://cdn.example", Path::new("/out/output_a.mp4")).as_deref(),
            Some("https://cdn.example/output_a.mp4")
        );
    }

    #[tokio::test]
    async fn reference_mode_without_base_url_attaches_nothing() {
        let notifier = ResultNotifier::new(&PipelineConfig::default()).unwrap();
        let artifact = Artifact {
            path: "/nonexistent/output_a.mp4".into(),
            size: 3,
        };
        assert!(notifier.attachment(&artifact).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inline_mode_encodes_artifact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output_a.mp4");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let config = PipelineConfig {
            delivery_mode: DeliveryMode::Inline,
            ..PipelineConfig::default()
        };
        let notifier = ResultNotifier::new(&config).unwrap();
        let attachment = notifier
            .attachment(&Artifact { path: path.clone(), size: 3 })
            .await
            .unwrap();

        assert_eq!(
            attachment,
            Some(ArtifactAttachment::Inline {
                video_base64: "AAEC".into(),
                metadata: ArtifactMetadata {
                    file_size: 3,
                    path: path.display().to_string(),
                },
            })
        );
    }
}
