//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use facecast_core::PipelineConfig;
use facecast_engine::{CropBox, EngineError, FaceInfo, GenerationEngine, ProcessRequest};
use facecast_pipeline::Orchestrator;

/// What the engine saw when `process` was called.
#[derive(Debug, Clone)]
pub struct ProcessCall {
    pub image_path: PathBuf,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub image_size: u64,
    pub audio_size: u64,
    pub inference_steps: u32,
    pub dynamic_scale: f64,
}

#[derive(Debug, Default)]
struct Calls {
    preprocess: Vec<PathBuf>,
    crops: Vec<(PathBuf, PathBuf)>,
    process: Vec<ProcessCall>,
}

/// In-memory engine that records every call.
#[derive(Debug)]
pub struct FakeEngine {
    face_num: i64,
    process_error: Option<String>,
    process_delay: Option<Duration>,
    calls: Mutex<Calls>,
}

impl FakeEngine {
    pub fn with_faces(face_num: i64) -> Arc<Self> {
        Arc::new(Self {
            face_num,
            process_error: None,
            process_delay: None,
            calls: Mutex::default(),
        })
    }

    /// Engine whose `process` takes `delay` before writing its output.
    pub fn slow_process(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            face_num: 1,
            process_error: None,
            process_delay: Some(delay),
            calls: Mutex::default(),
        })
    }

    pub fn failing_process(message: &str) -> Arc<Self> {
        Arc::new(Self {
            face_num: 1,
            process_error: Some(message.to_string()),
            process_delay: None,
            calls: Mutex::default(),
        })
    }

    pub fn preprocessed(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().preprocess.clone()
    }

    pub fn crops(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap().crops.clone()
    }

    pub fn processed(&self) -> Vec<ProcessCall> {
        self.calls.lock().unwrap().process.clone()
    }
}

fn size_of(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[async_trait]
impl GenerationEngine for FakeEngine {
    async fn preprocess(
        &self,
        image_path: &Path,
        _expand_ratio: f64,
    ) -> Result<FaceInfo, EngineError> {
        self.calls
            .lock()
            .unwrap()
            .preprocess
            .push(image_path.to_path_buf());
        let crop_bbox = if self.face_num > 0 {
            vec![10, 20, 110, 120]
        } else {
            Vec::new()
        };
        Ok(FaceInfo {
            face_num: self.face_num,
            crop_bbox,
        })
    }

    async fn crop_image(
        &self,
        src_path: &Path,
        dst_path: &Path,
        _bbox: &CropBox,
    ) -> Result<(), EngineError> {
        self.calls
            .lock()
            .unwrap()
            .crops
            .push((src_path.to_path_buf(), dst_path.to_path_buf()));
        std::fs::copy(src_path, dst_path)?;
        Ok(())
    }

    async fn process(&self, request: &ProcessRequest<'_>) -> Result<(), EngineError> {
        self.calls.lock().unwrap().process.push(ProcessCall {
            image_path: request.image_path.to_path_buf(),
            audio_path: request.audio_path.to_path_buf(),
            output_path: request.output_path.to_path_buf(),
            image_size: size_of(request.image_path),
            audio_size: size_of(request.audio_path),
            inference_steps: request.inference_steps,
            dynamic_scale: request.dynamic_scale,
        });
        if let Some(delay) = self.process_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.process_error {
            return Err(EngineError::Failed(message.clone()));
        }
        std::fs::write(request.output_path, b"fake mp4 bytes")?;
        Ok(())
    }
}

/// Scratch directories for one test: temp assets and outputs.
pub struct Workspace {
    pub temp: tempfile::TempDir,
    pub output: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            temp: tempfile::tempdir().unwrap(),
            output: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            temp_dir: self.temp.path().to_path_buf(),
            output_dir: self.output.path().to_path_buf(),
            ..PipelineConfig::default()
        }
    }

    pub fn orchestrator(&self, engine: Arc<FakeEngine>) -> Orchestrator {
        Orchestrator::new(self.config(), engine).unwrap()
    }

    /// Files left in the temp directory.
    pub fn temp_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}
