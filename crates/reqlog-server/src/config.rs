//! Server configuration: TOML file with command-line overrides

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use reqlog_logging::LogConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default maximum accepted request body (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Configuration for the reqlog HTTP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,
    /// Allow cross-origin requests from browser dashboards
    pub cors: bool,
    /// Bodies larger than this are recorded as undecodable
    pub body_limit: usize,
    /// Logging configuration
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cors: true,
            body_limit: DEFAULT_BODY_LIMIT,
            log: LogConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text; missing keys take defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Set the listen address
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Enable or disable CORS
    pub fn with_cors(mut self, cors: bool) -> Self {
        self.cors = cors;
        self
    }

    /// Set the body size limit
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Set the logging configuration
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

#[derive(Debug, Parser)]
#[command(name = "reqlog", version, about = "In-process HTTP activity logger")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g. 0.0.0.0:3000)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Human-readable console logs instead of JSONL
    #[arg(long)]
    pub pretty: bool,

    /// Disable CORS headers
    #[arg(long)]
    pub no_cors: bool,

    /// Maximum accepted request body in bytes
    #[arg(long)]
    pub body_limit: Option<usize>,
}

impl Cli {
    /// Merge the optional config file with command-line overrides
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if self.pretty {
            config.log.console.pretty = true;
        }
        if self.no_cors {
            config.cors = false;
        }
        if let Some(limit) = self.body_limit {
            config.body_limit = limit;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.port(), 3000);
        assert!(config.cors);
        assert_eq!(config.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn test_partial_toml() {
        let config = ServerConfig::from_toml_str(
            r#"
            bind = "0.0.0.0:8080"

            [log]
            level = "debug"

            [log.console]
            pretty = true
            "#,
        )
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:8080".parse().unwrap());
        assert!(config.cors);
        assert_eq!(config.log.level, "debug");
        assert!(config.log.console.pretty);
        assert!(config.log.console.enabled);
    }

    #[test]
    fn test_log_file_table() {
        let config = ServerConfig::from_toml_str(
            r#"
            [log.file]
            directory = "/var/log/reqlog"
            rotation = "hourly"
            "#,
        )
        .unwrap();

        let file = config.log.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/var/log/reqlog"));
        assert_eq!(file.rotation, reqlog_logging::RotationStrategy::Hourly);
        assert_eq!(file.prefix, "reqlog");
    }

    #[test]
    fn test_invalid_toml() {
        let err = ServerConfig::from_toml_str("bind = 12").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::load(Path::new("/nonexistent/reqlog.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"127.0.0.1:4000\"\ncors = true\nbody_limit = 10").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::try_parse_from([
            "reqlog",
            "--config",
            &path,
            "--bind",
            "127.0.0.1:5000",
            "--no-cors",
            "--log-level",
            "trace",
            "--pretty",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();

        assert_eq!(config.bind.port(), 5000);
        assert!(!config.cors);
        assert_eq!(config.body_limit, 10);
        assert_eq!(config.log.level, "trace");
        assert!(config.log.console.pretty);
    }

    #[test]
    fn test_cli_without_file_uses_defaults() {
        let cli = Cli::try_parse_from(["reqlog"]).unwrap();
        assert_eq!(cli.resolve().unwrap(), ServerConfig::default());
    }
}
