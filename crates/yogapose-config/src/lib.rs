//! Server configuration for yogapose.
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional JSON file named by `YOGAPOSE_CONFIG`
//! 3. Individual `YOGAPOSE_*` environment variables
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `YOGAPOSE_HOST` | `host` | `0.0.0.0` |
//! | `YOGAPOSE_PORT` | `port` | `8000` |
//! | `YOGAPOSE_MODEL_PATH` | `model_path` | `models/movenet_thunder.onnx` |
//! | `YOGAPOSE_INTRA_THREADS` | `intra_threads` | `1` |
//! | `YOGAPOSE_MAX_UPLOAD_BYTES` | `max_upload_bytes` | 16 MiB |
//!
//! # Loading from JSON
//!
//! ```rust
//! use yogapose_config::ServerConfig;
//!
//! let config = ServerConfig::from_json(r#"{ "port": 9000 }"#).unwrap();
//! assert_eq!(config.port, 9000);
//! assert_eq!(config.host, "0.0.0.0");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_FILE_VAR: &str = "YOGAPOSE_CONFIG";

const HOST_VAR: &str = "YOGAPOSE_HOST";
const PORT_VAR: &str = "YOGAPOSE_PORT";
const MODEL_PATH_VAR: &str = "YOGAPOSE_MODEL_PATH";
const INTRA_THREADS_VAR: &str = "YOGAPOSE_INTRA_THREADS";
const MAX_UPLOAD_VAR: &str = "YOGAPOSE_MAX_UPLOAD_BYTES";

/// Errors that can occur when loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON configuration.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A setting has an unusable value.
    #[error("Invalid setting '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Creates an invalid-setting error.
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Runtime settings for the pose server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
    /// Model artifact, relative to the working directory unless absolute.
    pub model_path: PathBuf,
    /// ONNX Runtime intra-op thread count.
    pub intra_threads: usize,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            model_path: PathBuf::from("models/movenet_thunder.onnx"),
            intra_threads: 1,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolves defaults, the optional config file and `YOGAPOSE_*` overrides
    /// from the process environment, then validates the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_VAR) {
            Some(path) => {
                debug!("Loading config file {}", path);
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_VAR) {
            self.host = host;
        }
        if let Some(port) = lookup(PORT_VAR) {
            self.port = parse_var(PORT_VAR, &port)?;
        }
        if let Some(path) = lookup(MODEL_PATH_VAR) {
            self.model_path = PathBuf::from(path);
        }
        if let Some(threads) = lookup(INTRA_THREADS_VAR) {
            self.intra_threads = parse_var(INTRA_THREADS_VAR, &threads)?;
        }
        if let Some(limit) = lookup(MAX_UPLOAD_VAR) {
            self.max_upload_bytes = parse_var(MAX_UPLOAD_VAR, &limit)?;
        }
        Ok(())
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be non-zero"));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::invalid("intra_threads", "must be at least 1"));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::invalid("max_upload_bytes", "must be at least 1"));
        }
        Ok(())
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, format!("'{}': {}", raw, e)))
}
