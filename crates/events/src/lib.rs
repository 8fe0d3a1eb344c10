//! Job outcome notifications.
//!
//! - [`WebhookPayload`] -- the JSON body announcing a finished or failed job.
//! - [`delivery`] -- external delivery channels (webhook).

pub mod delivery;
pub mod payload;

pub use delivery::webhook::{WebhookDelivery, WebhookError};
pub use payload::{ArtifactAttachment, ArtifactMetadata, WebhookPayload};
