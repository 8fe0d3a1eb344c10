//! Shared domain types for the facecast worker.
//!
//! - [`job`] -- invocation events, the validated [`job::Job`] and its
//!   [`job::InputDescriptor`].
//! - [`result`] -- the [`result::JobResult`] handed back to the host.
//! - [`config`] -- operator configuration for the job pipeline.
//! - [`error`] -- input and configuration errors.

pub mod config;
pub mod error;
pub mod job;
pub mod result;

pub use config::{DeliveryMode, PipelineConfig};
pub use error::{ConfigError, InputError};
pub use job::{DeliveryTarget, GenerationParameters, InputDescriptor, InvocationEvent, Job, JobRequest};
pub use result::JobResult;
