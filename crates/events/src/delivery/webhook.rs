//! Webhook delivery of job outcomes.
//!
//! [`WebhookDelivery`] POSTs a [`WebhookPayload`] to the caller's endpoint
//! with an `Authorization: Bearer <api key>` header. Each notification is a
//! single attempt; what a failed attempt means for the job is up to the
//! caller.

use std::time::Duration;

use facecast_core::DeliveryTarget;
use reqwest::header::AUTHORIZATION;

use crate::payload::WebhookPayload;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers job notifications to external webhook endpoints.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    client: reqwest::Client,
}

impl WebhookDelivery {
    /// Create a delivery service whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// POST `payload` to the target and check the response status.
    pub async fn deliver(
        &self,
        target: &DeliveryTarget,
        payload: &WebhookPayload<'_>,
    ) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(&target.url)
            .header(AUTHORIZATION, target.authorization())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::HttpStatus(status.as_u16()));
        }

        tracing::debug!(
            url = %target.url,
            job_id = %target.job_id,
            status = payload.result.status(),
            "Webhook delivered",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
