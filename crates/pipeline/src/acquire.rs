//! Materialise a job's image and audio as local temporary files.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use facecast_core::{InputDescriptor, PipelineConfig};
use futures::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::assets::{remove_quietly, AssetKind, JobAssets, LocalAsset};
use crate::error::{AcquireError, SetupError};

/// Prefix of every temporary file the worker creates.
pub const TEMP_FILE_PREFIX: &str = "facecast-";

/// Fetches or decodes input assets into the temp directory.
#[derive(Debug, Clone)]
pub struct AssetAcquirer {
    client: reqwest::Client,
    temp_dir: PathBuf,
}

impl AssetAcquirer {
    pub fn new(config: &PipelineConfig) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .build()?;
        Ok(Self::with_client(client, config.temp_dir.clone()))
    }

    pub fn with_client(client: reqwest::Client, temp_dir: PathBuf) -> Self {
        Self { client, temp_dir }
    }

    /// Produce the image and then the audio file.
    ///
    /// Each file is recorded in `assets` as soon as it exists, so a failure
    /// on the second asset still leaves the first one to be reaped.
    pub async fn acquire(
        &self,
        input: &InputDescriptor,
        assets: &mut JobAssets,
    ) -> Result<(), AcquireError> {
        let sources = match input {
            InputDescriptor::Reference {
                image_url,
                audio_url,
            } => [
                (AssetKind::Image, Source::Url(image_url)),
                (AssetKind::Audio, Source::Url(audio_url)),
            ],
            InputDescriptor::Inline {
                image_base64,
                audio_base64,
            } => [
                (AssetKind::Image, Source::Base64(image_base64)),
                (AssetKind::Audio, Source::Base64(audio_base64)),
            ],
        };

        for (kind, source) in sources {
            let asset = match source {
                Source::Url(url) => self.download(kind, url).await?,
                Source::Base64(data) => self.decode(kind, data).await?,
            };
            tracing::debug!(
                asset = kind.as_str(),
                path = %asset.path().display(),
                size = asset.size(),
                "Asset acquired",
            );
            if let Some(displaced) = assets.track(asset) {
                remove_quietly(displaced.path()).await;
            }
        }
        Ok(())
    }

    async fn download(&self, kind: AssetKind, url: &str) -> Result<LocalAsset, AcquireError> {
        let (file, path) = self.allocate(kind)?;
        match self.stream_to_file(url, file, &path).await {
            Ok(0) => {
                remove_quietly(&path).await;
                Err(AcquireError::Empty {
                    kind,
                    origin: url.to_string(),
                })
            }
            Ok(size) => Ok(LocalAsset::new(kind, path, size)),
            Err(e) => {
                remove_quietly(&path).await;
                Err(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        url: &str,
        file: tokio::fs::File,
        path: &Path,
    ) -> Result<u64, AcquireError> {
        let download_err = |source| AcquireError::Download {
            url: url.to_string(),
            source,
        };
        let write_err = |source| AcquireError::Write {
            path: path.to_path_buf(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(download_err)?;

        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut size: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(download_err)?;
            writer.write_all(&chunk).await.map_err(write_err)?;
            size += chunk.len() as u64;
        }
        writer.flush().await.map_err(write_err)?;
        Ok(size)
    }

    async fn decode(&self, kind: AssetKind, data: &str) -> Result<LocalAsset, AcquireError> {
        let bytes = decode_base64(data).map_err(|source| AcquireError::Decode { kind, source })?;
        if bytes.is_empty() {
            return Err(AcquireError::Empty {
                kind,
                origin: kind.base64_field().to_string(),
            });
        }

        let (file, path) = self.allocate(kind)?;
        let mut writer = BufWriter::new(file);
        let written = async {
            writer.write_all(&bytes).await?;
            writer.flush().await
        }
        .await;
        if let Err(source) = written {
            remove_quietly(&path).await;
            return Err(AcquireError::Write { path, source });
        }
        Ok(LocalAsset::new(kind, path, bytes.len() as u64))
    }

    /// Create a uniquely named file in the temp directory and detach it from
    /// automatic deletion; removal is owned by [`JobAssets::reap`].
    fn allocate(&self, kind: AssetKind) -> Result<(tokio::fs::File, PathBuf), AcquireError> {
        let named = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(kind.extension())
            .tempfile_in(&self.temp_dir)
            .map_err(AcquireError::TempFile)?;
        let (file, path) = named.keep().map_err(|e| AcquireError::TempFile(e.error))?;
        Ok((tokio::fs::File::from_std(file), path))
    }
}

enum Source<'a> {
    Url(&'a str),
    Base64(&'a str),
}

/// Decode standard base64, tolerating a `data:<mime>;base64,` prefix and
/// embedded whitespace.
fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    general_purpose::STANDARD.decode(compact)
}
