//! Interface to the external talking-head generation engine.
//!
//! - [`GenerationEngine`] -- the three engine operations a job needs
//!   (face detection, cropping, video synthesis).
//! - [`bridge`] -- production implementation that drives a long-lived engine
//!   process over newline-delimited JSON.
//! - [`handle`] -- the process-wide, lazily started engine shared by every
//!   job a worker process runs.

pub mod bridge;
pub mod engine;
pub mod handle;

pub use bridge::{BridgeConfig, EngineBridge};
pub use engine::{CropBox, EngineError, FaceInfo, GenerationEngine, ProcessRequest};
pub use handle::{EngineSlot, LazyEngine};
