//! Logging settings, read from the `[log]` table of the server config
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [log.console]
//! pretty = true
//!
//! [log.file]
//! directory = "/var/log/reqlog"
//! rotation = "hourly"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter used when `RUST_LOG` is unset
    pub level: String,

    pub console: ConsoleConfig,

    /// Rolling JSONL file written alongside the console
    pub file: Option<FileConfig>,

    pub json: JsonConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            json: JsonConfig::default(),
        }
    }
}

impl LogConfig {
    /// Warnings only, for test binaries
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Human-readable lines instead of JSONL
    pub pretty: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// Files are named `<prefix>.<date>.log`
    pub prefix: String,
    pub rotation: RotationStrategy,
    /// Older files beyond this count are deleted on rotation
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            prefix: "reqlog".to_string(),
            rotation: RotationStrategy::Daily,
            max_files: Some(7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Shape of each JSONL record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    /// Attach the enclosing request span (request id, trace id, path)
    pub spans: bool,
    /// Attach source file and line
    pub location: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            spans: true,
            location: false,
        }
    }
}
