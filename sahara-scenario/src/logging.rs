//! Logging configuration
//!
//! Console output goes to stderr so that stdout stays reserved for the
//! runner's own messages and the YAML dumps of `--verbose`.

use crate::settings::LoggingSettings;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_dir: Option<PathBuf>,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_dir: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Build from the runner settings; `verbose` forces debug level
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        Self {
            level: if verbose {
                "debug".to_string()
            } else {
                settings.level.clone()
            },
            file_dir: settings.log_dir.clone(),
            json_format: settings.json,
        }
    }

    /// Initialize logging. The returned guard must be kept alive for the
    /// file writer to flush.
    pub fn init(&self) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))?;

        let console_layer = if self.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(io::stderr)
                .boxed()
        } else {
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(true)
                .with_writer(io::stderr)
                .boxed()
        };

        let guard = if let Some(ref dir) = self.file_dir {
            let file_appender = rolling::never(dir, "sahara-scenario.log");
            let (writer, guard) = non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()?;
            Some(guard)
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init()?;
            None
        };

        tracing::debug!("Logging initialized - level: {}", self.level);

        Ok(guard)
    }
}
