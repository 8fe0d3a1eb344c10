#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use facecast_core::PipelineConfig;
use facecast_engine::{CropBox, EngineError, FaceInfo, GenerationEngine, ProcessRequest};
use facecast_pipeline::Orchestrator;
use facecast_worker::config::ServerConfig;
use facecast_worker::router::build_app;
use facecast_worker::state::AppState;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Engine that finds one face and writes a small output file.
pub struct StubEngine;

#[async_trait]
impl GenerationEngine for StubEngine {
    async fn preprocess(&self, _image: &Path, _ratio: f64) -> Result<FaceInfo, EngineError> {
        Ok(FaceInfo {
            face_num: 1,
            crop_bbox: vec![0, 0, 64, 64],
        })
    }

    async fn crop_image(
        &self,
        src_path: &Path,
        dst_path: &Path,
        _bbox: &CropBox,
    ) -> Result<(), EngineError> {
        std::fs::copy(src_path, dst_path)?;
        Ok(())
    }

    async fn process(&self, request: &ProcessRequest<'_>) -> Result<(), EngineError> {
        std::fs::write(request.output_path, b"mp4")?;
        Ok(())
    }
}

/// [`StubEngine`] whose `process` takes the given time.
pub struct SlowEngine(pub Duration);

#[async_trait]
impl GenerationEngine for SlowEngine {
    async fn preprocess(&self, image: &Path, ratio: f64) -> Result<FaceInfo, EngineError> {
        StubEngine.preprocess(image, ratio).await
    }

    async fn crop_image(
        &self,
        src_path: &Path,
        dst_path: &Path,
        bbox: &CropBox,
    ) -> Result<(), EngineError> {
        StubEngine.crop_image(src_path, dst_path, bbox).await
    }

    async fn process(&self, request: &ProcessRequest<'_>) -> Result<(), EngineError> {
        tokio::time::sleep(self.0).await;
        StubEngine.process(request).await
    }
}

pub fn test_orchestrator(temp: &Path, output: &Path) -> Arc<Orchestrator> {
    orchestrator_with(temp, output, Arc::new(StubEngine))
}

pub fn orchestrator_with(
    temp: &Path,
    output: &Path,
    engine: Arc<dyn GenerationEngine>,
) -> Arc<Orchestrator> {
    let config = PipelineConfig {
        temp_dir: temp.to_path_buf(),
        output_dir: output.to_path_buf(),
        ..PipelineConfig::default()
    };
    Arc::new(Orchestrator::new(config, engine).unwrap())
}

/// Build the router exactly as `main.rs` does.
pub fn build_test_app(orchestrator: Arc<Orchestrator>) -> Router {
    build_app(AppState::new(orchestrator), &ServerConfig::default())
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&json).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
