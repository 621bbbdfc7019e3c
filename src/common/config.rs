//! Runtime configuration loaded from defaults, an optional TOML file and the
//! process environment, in that order.
//!
//! ```toml
//! models_dir = "models"
//! artifact_ext = "json"
//!
//! [server]
//! bind = "127.0.0.1"
//! port = 8501
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::{NpkError, NpkResult};

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppCfg {
    /// Directory scanned for model artefacts.
    pub models_dir: PathBuf,
    /// Extension (without the dot) of artefact files.
    pub artifact_ext: String,
    pub server: ServerCfg,
    pub logging: LogCfg,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerCfg {
    pub bind: String,
    pub port: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogCfg {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub level: String,
    pub format: LogFormat,
}

/// Output format of log lines.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = NpkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(NpkError::config(format!("unknown log format '{other}'"))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            artifact_ext: "json".to_string(),
            server: ServerCfg::default(),
            logging: LogCfg::default(),
        }
    }
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl Default for LogCfg {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl AppCfg {
    /// Build a configuration snapshot: defaults, then the optional file, then
    /// `NPK_*` environment overrides.
    pub fn load(file: Option<&Path>) -> NpkResult<Self> {
        let mut cfg = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> NpkResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NpkError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> NpkResult<Self> {
        toml::from_str(content).map_err(|e| NpkError::config(e.to_string()))
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> NpkResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("NPK_MODELS_DIR") {
            self.models_dir = PathBuf::from(dir);
        }
        if let Some(ext) = lookup("NPK_ARTIFACT_EXT") {
            self.artifact_ext = ext.trim_start_matches('.').to_string();
        }
        if let Some(bind) = lookup("NPK_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("NPK_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| NpkError::config(format!("NPK_PORT is not a port: '{port}'")))?;
        }
        if let Some(level) = lookup("NPK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("NPK_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Render the configuration as TOML, used by `npk config-gen`.
    pub fn to_toml(&self) -> NpkResult<String> {
        toml::to_string_pretty(self).map_err(|e| NpkError::config(e.to_string()))
    }
}
