//! The job execution pipeline.
//!
//! One invocation runs one job through these stages, in order:
//!
//! 1. [`acquire`] -- materialise the image and audio as temporary files.
//! 2. [`gate`] -- reject images without a face; optionally crop to it.
//! 3. [`generate`] -- call the generation engine once.
//! 4. [`delivery`] -- notify the caller's webhook, if any.
//! 5. [`assets`] -- reap every temporary file, whatever happened above.
//!
//! [`Orchestrator`] sequences the stages and turns every failure into a
//! [`JobResult`](facecast_core::JobResult).

pub mod acquire;
pub mod assets;
pub mod delivery;
pub mod error;
pub mod gate;
pub mod generate;
pub mod orchestrator;
pub mod stage;

pub use acquire::AssetAcquirer;
pub use assets::{AssetKind, JobAssets, LocalAsset};
pub use error::{AcquireError, ErrorCategory, JobError, SetupError};
pub use orchestrator::Orchestrator;
pub use stage::JobStage;
