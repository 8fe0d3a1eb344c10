//! The single generation call and its artifact.

use std::path::{Path, PathBuf};

use facecast_core::GenerationParameters;
use facecast_engine::{GenerationEngine, ProcessRequest};

use crate::error::JobError;

/// The finished video file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
}

/// `<output dir>/output_<stem>.mp4`.
pub fn output_path(output_dir: &Path, stem: &str) -> PathBuf {
    output_dir.join(format!("output_{stem}.mp4"))
}

/// Invoke the engine exactly once and stat what it wrote.
pub async fn generate(
    engine: &dyn GenerationEngine,
    image: &Path,
    audio: &Path,
    output: &Path,
    params: &GenerationParameters,
) -> Result<Artifact, JobError> {
    if let Some(dir) = output.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| JobError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })?;
    }

    let request = ProcessRequest {
        image_path: image,
        audio_path: audio,
        output_path: output,
        min_resolution: params.min_resolution,
        inference_steps: params.inference_steps,
        dynamic_scale: params.dynamic_scale,
    };
    tracing::info!(
        image = %image.display(),
        audio = %audio.display(),
        output = %output.display(),
        inference_steps = params.inference_steps,
        dynamic_scale = params.dynamic_scale,
        "Starting video generation",
    );
    engine
        .process(&request)
        .await
        .map_err(JobError::Generation)?;

    let size = tokio::fs::metadata(output)
        .await
        .map_err(|_| JobError::OutputMissing(output.to_path_buf()))?
        .len();
    tracing::info!(output = %output.display(), size, "Video generated");

    Ok(Artifact {
        path: output.to_path_buf(),
        size,
    })
}
