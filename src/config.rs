//! Tool configuration.
//!
//! A small serde-backed config with per-field defaults, optionally loaded
//! from a JSON file next to the reports. CLI flags override whatever the
//! file provides; IO and JSON problems stay [`ConfigError`] and are never
//! mixed up with parse or aggregation failures.

use serde::{Deserialize, Serialize};
use std::{fs::File, io, io::BufReader, path::Path};
use thiserror::Error;

use crate::batch::ErrorPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Extension of raw report files picked up by `convert`.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Pretty-print JSON output (4-space indent).
    #[serde(default = "default_pretty")]
    pub pretty: bool,

    /// Behavior when one of several sources fails to parse.
    #[serde(default)]
    pub error_policy: ErrorPolicy,

    /// Delete each raw file after its JSON has been written.
    #[serde(default)]
    pub remove_sources: bool,
}

fn default_source_extension() -> String {
    "raw".to_string()
}

fn default_pretty() -> bool {
    true
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            source_extension: default_source_extension(),
            pretty: default_pretty(),
            error_policy: ErrorPolicy::default(),
            remove_sources: false,
        }
    }
}

impl ToolConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Loads the file if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
