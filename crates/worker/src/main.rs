//! `facecast-worker` -- serverless talking-head video worker.
//!
//! Serves `POST /runsync` by default. When `WORKER_TEST_INPUT` names an
//! event file, runs that single event, prints the job result as JSON and
//! exits.
//!
//! # Environment variables
//!
//! | Variable                | Default                              |
//! |-------------------------|--------------------------------------|
//! | `HOST` / `PORT`         | `0.0.0.0` / `8000`                   |
//! | `REQUEST_TIMEOUT_SECS`  | `900`                                |
//! | `WORKER_TEST_INPUT`     | unset                                |
//! | `LOG_FORMAT`            | `text`                               |
//! | `ENGINE_COMMAND`        | `python3 /workspace/sonic_bridge.py` |
//! | `OUTPUT_DIR`            | `/tmp/sonic_outputs`                 |
//! | `TEMP_DIR`              | system temp dir                      |
//! | `INFERENCE_STEPS`       | `20`                                 |
//! | `DOWNLOAD_TIMEOUT_SECS` | `60`                                 |
//! | `WEBHOOK_TIMEOUT_SECS`  | `30`                                 |
//! | `DELIVERY_PAYLOAD_MODE` | `reference`                          |
//! | `ARTIFACT_BASE_URL`     | unset                                |

use std::net::SocketAddr;
use std::sync::Arc;

use facecast_core::PipelineConfig;
use facecast_engine::{BridgeConfig, LazyEngine};
use facecast_pipeline::Orchestrator;
use facecast_worker::config::ServerConfig;
use facecast_worker::state::AppState;
use facecast_worker::{oneshot, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "facecast_worker=info,facecast_pipeline=info,facecast_engine=info";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let server_config = ServerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid server configuration: {e}");
        std::process::exit(1);
    });

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if server_config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let pipeline_config = PipelineConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid pipeline configuration");
        std::process::exit(1);
    });
    let bridge_config = BridgeConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid engine configuration");
        std::process::exit(1);
    });
    tracing::info!(
        output_dir = %pipeline_config.output_dir.display(),
        inference_steps = pipeline_config.inference_steps,
        delivery_mode = ?pipeline_config.delivery_mode,
        engine = %bridge_config.program,
        "Loaded worker configuration",
    );

    // --- Pipeline ---
    // The engine starts on the first job and is reused by every later one.
    let engine = Arc::new(LazyEngine::process_wide(bridge_config));
    let orchestrator = Arc::new(
        Orchestrator::new(pipeline_config, engine).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build job pipeline");
            std::process::exit(1);
        }),
    );

    // --- One-shot mode ---
    if let Some(path) = &server_config.test_input {
        match oneshot::run_file(&orchestrator, path).await {
            Ok(result) => {
                let json = serde_json::to_string_pretty(&result)
                    .expect("JobResult serialization is infallible");
                println!("{json}");
            }
            Err(e) => {
                tracing::error!(error = %e, "Test input failed");
                std::process::exit(1);
            }
        }
        return;
    }

    // --- Serve mode ---
    let app = router::build_app(AppState::new(orchestrator), &server_config);

    let addr = SocketAddr::new(
        server_config.host.parse().expect("Invalid HOST address"),
        server_config.port,
    );
    tracing::info!(%addr, "Starting worker");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Worker stopped");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
