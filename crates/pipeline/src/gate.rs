//! Face gate and optional face-centred crop.

use std::path::{Path, PathBuf};

use facecast_engine::{FaceInfo, GenerationEngine};

use crate::assets::{remove_quietly, AssetKind, JobAssets, LocalAsset};
use crate::error::JobError;

/// How far each detected face box is widened before the crop region is
/// computed.
pub const FACE_EXPAND_RATIO: f64 = 0.5;

/// Run face detection and reject images without a face.
pub async fn detect_faces(
    engine: &dyn GenerationEngine,
    image: &Path,
) -> Result<FaceInfo, JobError> {
    let info = engine
        .preprocess(image, FACE_EXPAND_RATIO)
        .await
        .map_err(JobError::Detection)?;

    tracing::info!(face_num = info.face_num, bbox = ?info.crop_bbox, "Face detection finished");
    if !info.has_face() {
        return Err(JobError::NoFace);
    }
    Ok(info)
}

/// Crop the current image to the detected face region.
///
/// The cropped file gets its own path and is tracked before the engine is
/// asked to write it, so it is reaped even if the crop fails half-way.
pub async fn crop_to_face(
    engine: &dyn GenerationEngine,
    assets: &mut JobAssets,
    info: &FaceInfo,
) -> Result<(), JobError> {
    let bbox = info.crop_box().ok_or(JobError::MissingCropRegion)?;
    let source = assets
        .current_image()
        .ok_or(JobError::AssetMissing(AssetKind::Image))?
        .path()
        .to_path_buf();
    let target = cropped_path(&source);

    if let Some(previous) = assets.track(LocalAsset::new(AssetKind::CroppedImage, target.clone(), 0))
    {
        remove_quietly(previous.path()).await;
    }

    engine
        .crop_image(&source, &target, &bbox)
        .await
        .map_err(JobError::Crop)?;

    let size = tokio::fs::metadata(&target)
        .await
        .map_err(|_| JobError::CropMissing(target.clone()))?
        .len();
    assets.set_cropped_size(size);

    tracing::info!(path = %target.display(), bbox = ?bbox, "Image cropped to face");
    Ok(())
}

/// `<source>.crop.png`, next to the source file.
fn cropped_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(".crop.png");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cropped_path_is_distinct_from_source() {
        let source = Path::new("/tmp/facecast-abc.png");
        let cropped = cropped_path(source);
        assert_eq!(cropped, Path::new("/tmp/facecast-abc.png.crop.png"));
        assert_ne!(cropped, source);
    }
}
