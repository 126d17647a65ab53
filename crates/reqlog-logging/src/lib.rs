//! JSONL logging and request correlation for reqlog
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for log aggregation (default)
//! - **Pretty Output**: Human-readable console output for development
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//! - **Request Correlation**: Request ids and W3C `traceparent` propagation
//!
//! # Quick Start
//!
//! ```ignore
//! use reqlog_logging::{LogConfig, ReqlogSubscriberBuilder};
//!
//! // JSONL to stdout at `info`; keep the guard alive while logging
//! let _guard = ReqlogSubscriberBuilder::new().try_init()?;
//!
//! // Pretty console output at `debug`
//! let _guard = ReqlogSubscriberBuilder::new()
//!     .with_level("debug")
//!     .with_pretty(true)
//!     .try_init()?;
//! ```
//!
//! # Request Context
//!
//! ```ignore
//! use reqlog_logging::RequestContext;
//!
//! let ctx = RequestContext::from_headers(traceparent, request_id);
//! let span = tracing::info_span!("request", request_id = %ctx.request_id);
//! ```

pub mod config;
pub mod request;

pub use config::{ConsoleConfig, FileConfig, JsonConfig, LogConfig, RotationStrategy};
pub use request::RequestContext;

use std::io::IsTerminal;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the global subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log file appender: {0}")]
    FileAppender(#[from] InitError),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Builder for configuring and initializing the reqlog logging subscriber
///
/// By default, console output uses JSONL format. `with_pretty(true)` switches
/// the console to human-readable lines.
pub struct ReqlogSubscriberBuilder {
    config: LogConfig,
}

impl ReqlogSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Switch the console between pretty and JSONL output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.config.console.pretty = pretty;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Install the subscriber globally
    ///
    /// Returns a guard that must be kept alive for the duration of the
    /// program when file output is enabled.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.level));
        let registry = Registry::default().with(env_filter);

        let console = &self.config.console;
        let jsonl = &self.config.json;
        let ansi = std::io::stdout().is_terminal();
        let mut guard = None;

        match (console.enabled, console.pretty, self.config.file.as_ref()) {
            // Pretty console + File
            (true, true, Some(file_config)) => {
                let (writer, file_guard) = file_writer(file_config)?;
                guard = Some(file_guard);

                let console_layer = fmt::layer().with_ansi(ansi).with_target(true);
                registry
                    .with(console_layer)
                    .with(jsonl_layer(jsonl, writer))
                    .try_init()?;
            }

            // JSONL console + File
            (true, false, Some(file_config)) => {
                let (writer, file_guard) = file_writer(file_config)?;
                guard = Some(file_guard);

                registry
                    .with(jsonl_layer(jsonl, std::io::stdout))
                    .with(jsonl_layer(jsonl, writer))
                    .try_init()?;
            }

            // Pretty console only
            (true, true, None) => {
                let console_layer = fmt::layer().with_ansi(ansi).with_target(true);
                registry.with(console_layer).try_init()?;
            }

            // JSONL console only (DEFAULT)
            (true, false, None) => {
                registry.with(jsonl_layer(jsonl, std::io::stdout)).try_init()?;
            }

            // File only (no console)
            (false, _, Some(file_config)) => {
                let (writer, file_guard) = file_writer(file_config)?;
                guard = Some(file_guard);

                registry.with(jsonl_layer(jsonl, writer)).try_init()?;
            }

            // Nothing enabled - just base registry
            (false, _, None) => {
                registry.try_init()?;
            }
        }

        Ok(guard)
    }
}

impl Default for ReqlogSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn jsonl_layer<S, W>(config: &JsonConfig, writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(config.spans)
        .with_span_list(config.spans)
        .flatten_event(true)
        .with_file(config.location)
        .with_line_number(config.location)
        .with_writer(writer)
}

fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let rotation = match config.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => Rotation::NEVER,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }

    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging for testing (minimal output, ignores double init)
pub fn init_testing() {
    let _ = ReqlogSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = ReqlogSubscriberBuilder::new();
        assert_eq!(builder.config.level, "info");
    }

    #[test]
    fn test_default_is_jsonl() {
        let builder = ReqlogSubscriberBuilder::new();
        assert!(!builder.config.console.pretty); // JSONL by default
    }

    #[test]
    fn test_builder_with_config() {
        let builder = ReqlogSubscriberBuilder::new().with_config(LogConfig::testing());
        assert_eq!(builder.config.level, "warn");
        assert!(!builder.config.console.pretty);
    }

    #[test]
    fn test_builder_with_level() {
        let builder = ReqlogSubscriberBuilder::new().with_level("trace");
        assert_eq!(builder.config.level, "trace");
    }

    #[test]
    fn test_builder_with_console() {
        let builder = ReqlogSubscriberBuilder::new().with_console(false);
        assert!(!builder.config.console.enabled);
    }

    #[test]
    fn test_builder_with_pretty() {
        let builder = ReqlogSubscriberBuilder::new().with_pretty(true);
        assert!(builder.config.console.pretty);
    }

    #[test]
    fn test_file_writer_creates_directory_appender() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            directory: dir.path().join("nested"),
            rotation: RotationStrategy::Never,
            ..FileConfig::default()
        };
        let (_writer, _guard) = file_writer(&config).unwrap();
        assert!(dir.path().join("nested").exists());
    }

    #[test]
    fn test_init_testing_is_idempotent() {
        init_testing();
        init_testing();
    }
}
