//! Newline-delimited JSON bridge to the engine process.
//!
//! The engine runs as a child process started from `ENGINE_COMMAND`. Each
//! request is one JSON object on the child's stdin:
//!
//! ```text
//! {"op":"ping"}
//! {"op":"preprocess","image_path":"/tmp/a.png","expand_ratio":0.5}
//! {"op":"crop_image","src_path":"...","dst_path":"...","crop_bbox":[x1,y1,x2,y2]}
//! {"op":"process","image_path":"...","audio_path":"...","output_path":"...",
//!  "min_resolution":512,"inference_steps":20,"dynamic_scale":1.0}
//! ```
//!
//! and is answered by one line on stdout, either `{"ok":true,"result":...}`
//! or `{"ok":false,"error":"..."}`. Stdout lines that are not JSON objects
//! are treated as engine chatter and logged. Stderr is inherited.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use facecast_core::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::engine::{CropBox, EngineError, FaceInfo, GenerationEngine, ProcessRequest};

/// Engine command used when `ENGINE_COMMAND` is not set.
pub const DEFAULT_ENGINE_COMMAND: &str = "python3 /workspace/sonic_bridge.py";

/// Command line used to start the engine process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl BridgeConfig {
    /// Split a whitespace-separated command line into program and args.
    pub fn from_command_line(command: &str) -> Result<Self, ConfigError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ConfigError::Empty("ENGINE_COMMAND"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Read `ENGINE_COMMAND`, falling back to [`DEFAULT_ENGINE_COMMAND`].
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("ENGINE_COMMAND") {
            Ok(command) => Self::from_command_line(&command),
            Err(_) => Self::from_command_line(DEFAULT_ENGINE_COMMAND),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    Ping,
    Preprocess {
        image_path: &'a Path,
        expand_ratio: f64,
    },
    CropImage {
        src_path: &'a Path,
        dst_path: &'a Path,
        crop_bbox: &'a CropBox,
    },
    Process {
        image_path: &'a Path,
        audio_path: &'a Path,
        output_path: &'a Path,
        min_resolution: u32,
        inference_steps: u32,
        dynamic_scale: f64,
    },
}

#[derive(Deserialize)]
struct BridgeResponse {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug)]
struct Channel {
    // Held so the child is killed when the bridge is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// A running engine process.
///
/// Each request/response round-trip runs in its own task that holds the
/// channel until the response line is read. A caller that stops waiting
/// never leaves an unread response behind for the next caller.
#[derive(Debug)]
pub struct EngineBridge {
    channel: Arc<Mutex<Channel>>,
}

impl EngineBridge {
    /// Start the engine process and wait until it answers a ping.
    ///
    /// Model loading happens inside the child before it answers, so this
    /// call can take a long time on a cold worker.
    pub async fn spawn(config: &BridgeConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        tracing::info!(
            program = %config.program,
            pid = child.id(),
            "Generation engine process started",
        );

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("engine stdin is not piped".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("engine stdout is not piped".into()))?;

        let bridge = Self {
            channel: Arc::new(Mutex::new(Channel {
                _child: child,
                stdin,
                stdout: BufReader::new(stdout),
            })),
        };
        bridge.call::<Value>(&BridgeRequest::Ping).await?;
        Ok(bridge)
    }

    /// Send one request and wait for its response.
    async fn call<T: DeserializeOwned>(
        &self,
        request: &BridgeRequest<'_>,
    ) -> Result<T, EngineError> {
        let mut line =
            serde_json::to_string(request).map_err(|e| EngineError::Protocol(e.to_string()))?;
        line.push('\n');

        let channel = Arc::clone(&self.channel);
        let response = tokio::spawn(async move {
            let mut channel = channel.lock_owned().await;
            channel.round_trip(&line).await
        })
        .await
        .map_err(EngineError::Aborted)??;

        if !response.ok {
            return Err(EngineError::Failed(
                response
                    .error
                    .unwrap_or_else(|| "generation engine reported an unknown error".into()),
            ));
        }
        serde_json::from_value(response.result).map_err(|e| EngineError::Protocol(e.to_string()))
    }
}

impl Channel {
    /// Write one request line and read lines until the response object.
    async fn round_trip(&mut self, line: &str) -> Result<BridgeResponse, EngineError> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        loop {
            let mut buf = String::new();
            if self.stdout.read_line(&mut buf).await? == 0 {
                return Err(EngineError::Closed);
            }
            let trimmed = buf.trim();
            if trimmed.starts_with('{') {
                return serde_json::from_str::<BridgeResponse>(trimmed)
                    .map_err(|e| EngineError::Protocol(format!("{e}: {trimmed}")));
            }
            if !trimmed.is_empty() {
                tracing::debug!(line = %trimmed, "Engine output");
            }
        }
    }
}

#[async_trait]
impl GenerationEngine for EngineBridge {
    async fn preprocess(
        &self,
        image_path: &Path,
        expand_ratio: f64,
    ) -> Result<FaceInfo, EngineError> {
        self.call(&BridgeRequest::Preprocess {
            image_path,
            expand_ratio,
        })
        .await
    }

    async fn crop_image(
        &self,
        src_path: &Path,
        dst_path: &Path,
        bbox: &CropBox,
    ) -> Result<(), EngineError> {
        self.call::<Value>(&BridgeRequest::CropImage {
            src_path,
            dst_path,
            crop_bbox: bbox,
        })
        .await
        .map(drop)
    }

    async fn process(&self, request: &ProcessRequest<'_>) -> Result<(), EngineError> {
        self.call::<Value>(&BridgeRequest::Process {
            image_path: request.image_path,
            audio_path: request.audio_path,
            output_path: request.output_path,
            min_resolution: request.min_resolution,
            inference_steps: request.inference_steps,
            dynamic_scale: request.dynamic_scale,
        })
        .await
        .map(drop)
    }
}
