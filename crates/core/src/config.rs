use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default artifact directory.
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/sonic_outputs";

/// Default engine inference steps (quality/speed trade-off).
pub const DEFAULT_INFERENCE_STEPS: u32 = 20;

/// Default per-asset download timeout.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Default delivery POST timeout.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 30;

/// How the finished artifact is handed to the delivery target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Embed the artifact bytes as base64 in the notification.
    Inline,
    /// Send the artifact location and size only.
    #[default]
    Reference,
}

impl FromStr for DeliveryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "reference" => Ok(Self::Reference),
            _ => Err(ConfigError::InvalidValue {
                var: "DELIVERY_PAYLOAD_MODE",
                expected: "mode (inline or reference)",
                value: s.to_string(),
            }),
        }
    }
}

/// Operator configuration for the job pipeline.
///
/// The three deployment flavours of the worker differ only in these
/// policies; everything else about a job is fixed.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory receiving `output_<job id>.mp4` artifacts.
    pub output_dir: PathBuf,
    /// Directory for temporary input assets.
    pub temp_dir: PathBuf,
    pub inference_steps: u32,
    pub download_timeout: Duration,
    pub webhook_timeout: Duration,
    pub delivery_mode: DeliveryMode,
    /// Public base URL used to build `video_url` in reference mode.
    pub artifact_base_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            temp_dir: std::env::temp_dir(),
            inference_steps: DEFAULT_INFERENCE_STEPS,
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            webhook_timeout: Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            delivery_mode: DeliveryMode::default(),
            artifact_base_url: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default              |
    /// |-------------------------|----------------------|
    /// | `OUTPUT_DIR`            | `/tmp/sonic_outputs` |
    /// | `TEMP_DIR`              | system temp dir      |
    /// | `INFERENCE_STEPS`       | `20`                 |
    /// | `DOWNLOAD_TIMEOUT_SECS` | `60`                 |
    /// | `WEBHOOK_TIMEOUT_SECS`  | `30`                 |
    /// | `DELIVERY_PAYLOAD_MODE` | `reference`          |
    /// | `ARTIFACT_BASE_URL`     | unset                |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let output_dir = var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);
        let temp_dir = var("TEMP_DIR").map(PathBuf::from).unwrap_or(defaults.temp_dir);

        let inference_steps = match var("INFERENCE_STEPS") {
            Some(v) => parse_positive("INFERENCE_STEPS", &v)?,
            None => defaults.inference_steps,
        };
        let download_timeout = match var("DOWNLOAD_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive::<u64>("DOWNLOAD_TIMEOUT_SECS", &v)?),
            None => defaults.download_timeout,
        };
        let webhook_timeout = match var("WEBHOOK_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive::<u64>("WEBHOOK_TIMEOUT_SECS", &v)?),
            None => defaults.webhook_timeout,
        };
        let delivery_mode = match var("DELIVERY_PAYLOAD_MODE") {
            Some(v) => v.parse()?,
            None => defaults.delivery_mode,
        };
        let artifact_base_url = var("ARTIFACT_BASE_URL");

        Ok(Self {
            output_dir,
            temp_dir,
            inference_steps,
            download_timeout,
            webhook_timeout,
            delivery_mode,
            artifact_base_url,
        })
    }
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidValue {
            var,
            expected: "positive integer",
            value: value.to_string(),
        }),
    }
}
