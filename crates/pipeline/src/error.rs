use std::path::PathBuf;

use facecast_core::InputError;
use facecast_engine::EngineError;

use crate::assets::AssetKind;

/// Errors while materialising input assets.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("Failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode {}: {source}", .kind.base64_field())]
    Decode {
        kind: AssetKind,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Input {} is empty: {origin}", .kind.as_str())]
    Empty { kind: AssetKind, origin: String },

    #[error("Failed to allocate temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Any failure that ends a job as `Failed`.
///
/// The display text of each variant is what the caller sees in the
/// `error` field of the result.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Acquisition(#[from] AcquireError),

    #[error("Face detection failed: {0}")]
    Detection(#[source] EngineError),

    #[error("No face detected in the image")]
    NoFace,

    #[error("Face detected but the engine reported no crop region")]
    MissingCropRegion,

    #[error("Failed to crop image: {0}")]
    Crop(#[source] EngineError),

    #[error("Cropped image was not written to {}", .0.display())]
    CropMissing(PathBuf),

    #[error("Video generation failed: {0}")]
    Generation(#[source] EngineError),

    #[error("Failed to prepare output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Generation engine produced no output at {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("Required {} asset was not acquired", .0.as_str())]
    AssetMissing(AssetKind),
}

/// Error taxonomy used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Acquisition,
    Precondition,
    Generation,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Acquisition => "acquisition",
            Self::Precondition => "precondition",
            Self::Generation => "generation",
        }
    }
}

impl JobError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input(_) => ErrorCategory::Input,
            Self::Acquisition(_) | Self::AssetMissing(_) => ErrorCategory::Acquisition,
            Self::Detection(_)
            | Self::NoFace
            | Self::MissingCropRegion
            | Self::Crop(_)
            | Self::CropMissing(_) => ErrorCategory::Precondition,
            Self::Generation(_) | Self::OutputDir { .. } | Self::OutputMissing(_) => {
                ErrorCategory::Generation
            }
        }
    }
}

/// Errors while building the pipeline at startup.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to build webhook client: {0}")]
    Webhook(#[from] facecast_events::WebhookError),
}
