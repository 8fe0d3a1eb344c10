//! Temporary assets owned by a job, and their reaping.
//!
//! Every file the acquirer or the crop step creates is recorded in the job's
//! [`JobAssets`]. [`JobAssets::reap`] consumes the set, so each file is
//! deleted exactly once, after delivery, on every exit path. A set dropped
//! without being reaped, because its job was cancelled, deletes its files
//! synchronously on drop.

use std::path::{Path, PathBuf};

/// Role of a temporary asset within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Audio,
    CroppedImage,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::CroppedImage => "cropped_image",
        }
    }

    /// File extension given to temporary files of this kind.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Image | Self::CroppedImage => ".png",
            Self::Audio => ".mp3",
        }
    }

    /// Name of the request field carrying this asset inline.
    pub fn base64_field(self) -> &'static str {
        match self {
            Self::Image | Self::CroppedImage => "image_base64",
            Self::Audio => "audio_base64",
        }
    }
}

/// A temporary file holding one input or derived asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    kind: AssetKind,
    path: PathBuf,
    size: u64,
}

impl LocalAsset {
    pub fn new(kind: AssetKind, path: PathBuf, size: u64) -> Self {
        Self { kind, path, size }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// The temporary files of one job.
#[derive(Debug, Default)]
pub struct JobAssets {
    image: Option<LocalAsset>,
    audio: Option<LocalAsset>,
    cropped_image: Option<LocalAsset>,
}

impl JobAssets {
    /// Record an asset in the slot for its kind.
    ///
    /// Each slot is filled at most once per job; a second asset of the same
    /// kind replaces the first, which is returned so the caller can dispose
    /// of it.
    #[must_use = "a displaced asset must still be deleted"]
    pub fn track(&mut self, asset: LocalAsset) -> Option<LocalAsset> {
        let slot = match asset.kind {
            AssetKind::Image => &mut self.image,
            AssetKind::Audio => &mut self.audio,
            AssetKind::CroppedImage => &mut self.cropped_image,
        };
        slot.replace(asset)
    }

    /// The original image, before any crop.
    pub fn original_image(&self) -> Option<&LocalAsset> {
        self.image.as_ref()
    }

    /// The image the engine should use: the cropped one when present.
    pub fn current_image(&self) -> Option<&LocalAsset> {
        self.cropped_image.as_ref().or(self.image.as_ref())
    }

    pub fn audio(&self) -> Option<&LocalAsset> {
        self.audio.as_ref()
    }

    /// Update the recorded size of the cropped image once it is written.
    pub(crate) fn set_cropped_size(&mut self, size: u64) {
        if let Some(cropped) = self.cropped_image.as_mut() {
            cropped.size = size;
        }
    }

    /// Paths of every tracked file.
    pub fn paths(&self) -> Vec<&Path> {
        self.iter().map(LocalAsset::path).collect()
    }

    fn iter(&self) -> impl Iterator<Item = &LocalAsset> {
        [&self.image, &self.audio, &self.cropped_image]
            .into_iter()
            .flatten()
    }

    /// Delete every tracked file. Never fails.
    ///
    /// Files that are already gone or cannot be removed are skipped. Returns
    /// the number of files actually deleted.
    pub async fn reap(mut self) -> usize {
        let mut removed = 0;
        for asset in self.take_all() {
            if remove_quietly(&asset.path).await {
                removed += 1;
            }
        }
        removed
    }
}

impl JobAssets {
    fn take_all(&mut self) -> impl Iterator<Item = LocalAsset> {
        [
            self.image.take(),
            self.audio.take(),
            self.cropped_image.take(),
        ]
        .into_iter()
        .flatten()
    }
}

impl Drop for JobAssets {
    fn drop(&mut self) {
        for asset in self.take_all() {
            match std::fs::remove_file(&asset.path) {
                Ok(()) => tracing::warn!(
                    path = %asset.path.display(),
                    "Removed temporary file of abandoned job",
                ),
                Err(e) => tracing::debug!(
                    path = %asset.path.display(),
                    error = %e,
                    "Temporary file not removed",
                ),
            }
        }
    }
}

/// Delete a file, logging instead of failing. Returns whether it was removed.
pub(crate) async fn remove_quietly(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed temporary file");
            true
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Temporary file not removed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        tokio::fs::write(&path, b"data").await.unwrap();
        path
    }

    #[tokio::test]
    async fn reap_removes_every_tracked_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = touch(dir.path(), "a.png").await;
        let audio = touch(dir.path(), "a.mp3").await;
        let cropped = touch(dir.path(), "a.png.crop.png").await;

        let mut assets = JobAssets::default();
        assert!(assets.track(LocalAsset::new(AssetKind::Image, image.clone(), 4)).is_none());
        assert!(assets.track(LocalAsset::new(AssetKind::Audio, audio.clone(), 4)).is_none());
        assert!(assets
            .track(LocalAsset::new(AssetKind::CroppedImage, cropped.clone(), 4))
            .is_none());

        assert_eq!(assets.reap().await, 3);
        assert!(!image.exists());
        assert!(!audio.exists());
        assert!(!cropped.exists());
    }

    #[tokio::test]
    async fn reap_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let image = touch(dir.path(), "a.png").await;

        let mut assets = JobAssets::default();
        let _ = assets.track(LocalAsset::new(AssetKind::Image, image, 4));
        let _ = assets.track(LocalAsset::new(
            AssetKind::CroppedImage,
            dir.path().join("never-written.png"),
            0,
        ));

        assert_eq!(assets.reap().await, 1);
    }

    #[tokio::test]
    async fn dropping_unreaped_assets_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let image = touch(dir.path(), "a.png").await;
        let audio = touch(dir.path(), "a.mp3").await;

        let mut assets = JobAssets::default();
        let _ = assets.track(LocalAsset::new(AssetKind::Image, image.clone(), 4));
        let _ = assets.track(LocalAsset::new(AssetKind::Audio, audio.clone(), 4));
        drop(assets);

        assert!(!image.exists());
        assert!(!audio.exists());
    }

    #[test]
    fn current_image_prefers_cropped() {
        let mut assets = JobAssets::default();
        let _ = assets.track(LocalAsset::new(AssetKind::Image, "/tmp/a.png".into(), 1));
        assert_eq!(assets.current_image().unwrap().path(), Path::new("/tmp/a.png"));

        let _ = assets.track(LocalAsset::new(
            AssetKind::CroppedImage,
            "/tmp/a.png.crop.png".into(),
            1,
        ));
        assert_eq!(
            assets.current_image().unwrap().path(),
            Path::new("/tmp/a.png.crop.png")
        );
        assert_eq!(
            assets.original_image().unwrap().path(),
            Path::new("/tmp/a.png")
        );
        assert_eq!(assets.paths().len(), 2);
    }

    #[test]
    fn extensions_match_asset_kind() {
        assert_eq!(AssetKind::Image.extension(), ".png");
        assert_eq!(AssetKind::Audio.extension(), ".mp3");
    }
}
