//! Engine trait and the data it exchanges with the pipeline.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Face-detection result for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceInfo {
    /// Number of faces found.
    pub face_num: i64,
    /// Crop region as `[x1, y1, x2, y2]`; empty when no face was found.
    #[serde(default)]
    pub crop_bbox: Vec<i64>,
}

impl FaceInfo {
    pub fn has_face(&self) -> bool {
        self.face_num > 0
    }

    /// The crop region, if the engine reported a well-formed one.
    pub fn crop_box(&self) -> Option<CropBox> {
        <[i64; 4]>::try_from(self.crop_bbox.as_slice())
            .ok()
            .map(CropBox)
    }
}

/// A face-centred crop rectangle `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CropBox(pub [i64; 4]);

/// Arguments of a single video synthesis call.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRequest<'a> {
    pub image_path: &'a Path,
    pub audio_path: &'a Path,
    pub output_path: &'a Path,
    pub min_resolution: u32,
    pub inference_steps: u32,
    pub dynamic_scale: f64,
}

/// Errors from the generation engine or the channel to it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to start generation engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Generation engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generation engine exited unexpectedly")]
    Closed,

    #[error("Malformed generation engine response: {0}")]
    Protocol(String),

    /// The task driving an engine round-trip panicked or was aborted.
    #[error("Generation engine call did not complete: {0}")]
    Aborted(#[source] tokio::task::JoinError),

    /// The engine ran and reported a failure.
    #[error("{0}")]
    Failed(String),
}

impl EngineError {
    /// Whether the engine process can no longer be used and must be
    /// replaced before the next call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Closed | Self::Aborted(_))
    }
}

/// The external media synthesis engine.
///
/// Every call blocks the calling job until the engine answers; calls are
/// never retried by the caller.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Detect faces in `image_path`, widening each candidate box by
    /// `expand_ratio` before the crop region is computed.
    async fn preprocess(&self, image_path: &Path, expand_ratio: f64)
        -> Result<FaceInfo, EngineError>;

    /// Write the `bbox` region of `src_path` to `dst_path`.
    async fn crop_image(
        &self,
        src_path: &Path,
        dst_path: &Path,
        bbox: &CropBox,
    ) -> Result<(), EngineError>;

    /// Synthesize one video at `request.output_path`.
    async fn process(&self, request: &ProcessRequest<'_>) -> Result<(), EngineError>;
}
