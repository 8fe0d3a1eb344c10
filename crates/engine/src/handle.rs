//! Process-wide engine handle.
//!
//! Loading the engine's models dominates cold-start cost, so a worker
//! process keeps one engine running and every job reuses it. The slot is
//! filled by the first engine call that succeeds in starting it; a failed
//! start leaves it empty and the next job tries again. When a call finds
//! the engine process gone, the slot is emptied so the next job starts a
//! fresh one.
//!
//! Access contract: the host runs at most one job per process at a time.
//! The handle does not queue or reorder jobs.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::bridge::{BridgeConfig, EngineBridge};
use crate::engine::{CropBox, EngineError, FaceInfo, GenerationEngine, ProcessRequest};

static PROCESS_ENGINE: EngineSlot = EngineSlot::new();

/// Holds the running engine bridge, if any.
#[derive(Debug)]
pub struct EngineSlot(Mutex<Option<Arc<EngineBridge>>>);

impl EngineSlot {
    pub const fn new() -> Self {
        Self(Mutex::const_new(None))
    }
}

impl Default for EngineSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine that starts its bridge process on first use.
#[derive(Debug)]
pub struct LazyEngine {
    config: BridgeConfig,
    slot: &'static EngineSlot,
}

impl LazyEngine {
    /// Handle backed by the single engine slot of this process.
    pub fn process_wide(config: BridgeConfig) -> Self {
        Self {
            config,
            slot: &PROCESS_ENGINE,
        }
    }

    /// Handle backed by a caller-owned slot.
    pub fn with_slot(config: BridgeConfig, slot: &'static EngineSlot) -> Self {
        Self { config, slot }
    }

    /// Whether an engine process is currently running.
    pub async fn is_initialized(&self) -> bool {
        self.slot.0.lock().await.is_some()
    }

    async fn engine(&self) -> Result<Arc<EngineBridge>, EngineError> {
        let mut slot = self.slot.0.lock().await;
        if let Some(bridge) = slot.as_ref() {
            return Ok(Arc::clone(bridge));
        }
        tracing::info!("Initializing generation engine");
        let bridge = Arc::new(EngineBridge::spawn(&self.config).await?);
        tracing::info!("Generation engine initialized");
        *slot = Some(Arc::clone(&bridge));
        Ok(bridge)
    }

    /// Drop `bridge` from the slot when `result` shows it is unusable.
    async fn check<T>(
        &self,
        bridge: &Arc<EngineBridge>,
        result: Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        if let Err(e) = &result {
            if e.is_fatal() {
                let mut slot = self.slot.0.lock().await;
                if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, bridge)) {
                    tracing::warn!(error = %e, "Generation engine lost, restarting on next job");
                    *slot = None;
                }
            }
        }
        result
    }
}

#[async_trait]
impl GenerationEngine for LazyEngine {
    async fn preprocess(
        &self,
        image_path: &Path,
        expand_ratio: f64,
    ) -> Result<FaceInfo, EngineError> {
        let bridge = self.engine().await?;
        let result = bridge.preprocess(image_path, expand_ratio).await;
        self.check(&bridge, result).await
    }

    async fn crop_image(
        &self,
        src_path: &Path,
        dst_path: &Path,
        bbox: &CropBox,
    ) -> Result<(), EngineError> {
        let bridge = self.engine().await?;
        let result = bridge.crop_image(src_path, dst_path, bbox).await;
        self.check(&bridge, result).await
    }

    async fn process(&self, request: &ProcessRequest<'_>) -> Result<(), EngineError> {
        let bridge = self.engine().await?;
        let result = bridge.process(request).await;
        self.check(&bridge, result).await
    }
}
