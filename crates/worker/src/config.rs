use std::path::PathBuf;

use facecast_core::ConfigError;

/// Default HTTP request timeout. A job whose request times out keeps running
/// to completion and holds the job lock until it does.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 900;

/// Host surface configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `900`).
    pub request_timeout_secs: u64,
    /// Event file for one-shot mode; serve mode when unset.
    pub test_input: Option<PathBuf>,
    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            test_input: None,
            json_logs: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default   |
    /// |------------------------|-----------|
    /// | `HOST`                 | `0.0.0.0` |
    /// | `PORT`                 | `8000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `900`     |
    /// | `WORKER_TEST_INPUT`    | unset     |
    /// | `LOG_FORMAT`           | `text`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("HOST").unwrap_or(defaults.host);

        let port = match var("PORT") {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                var: "PORT",
                expected: "port number",
                value: v,
            })?,
            None => defaults.port,
        };

        let request_timeout_secs = match var("REQUEST_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "REQUEST_TIMEOUT_SECS",
                        expected: "positive integer",
                        value: v,
                    })
                }
            },
            None => defaults.request_timeout_secs,
        };

        let json_logs = match var("LOG_FORMAT").as_deref() {
            None | Some("text") => false,
            Some("json") => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "LOG_FORMAT",
                    expected: "log format (text or json)",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            test_input: var("WORKER_TEST_INPUT").map(PathBuf::from),
            json_logs,
        })
    }
}
