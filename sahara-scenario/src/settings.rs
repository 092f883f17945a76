//! Runner settings
//!
//! Settings are loaded from:
//! 1. Environment variables (highest priority)
//! 2. Configuration file (TOML format)
//! 3. Default values (lowest priority)

use sahara_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main settings struct for the scenario runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Resource locations
    pub paths: PathsSettings,
    /// External test runner
    pub runner: TestRunnerSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Resource locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSettings {
    /// Directory holding credentials.yaml.mako, edp.yaml.mako and the
    /// per-release plugin templates
    pub templates_dir: PathBuf,
}

/// External test runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRunnerSettings {
    /// Program and leading arguments, e.g. ["stestr", "run"]
    pub command: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for log files, file logging is off when unset
    pub log_dir: Option<PathBuf>,
    /// Use JSON formatting for the console
    pub json: bool,
}

impl Default for PathsSettings {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/defaults")),
        }
    }
}

impl Default for TestRunnerSettings {
    fn default() -> Self {
        Self {
            command: vec!["stestr".to_string(), "run".to_string()],
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            json: false,
        }
    }
}

impl RunnerSettings {
    /// Load settings from the first config file found, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        settings.apply_env_overrides();
        settings.validate()?;

        Ok(settings)
    }

    /// Load settings from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            std::env::var("SAHARA_SCENARIO_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("/etc/sahara-scenario/config.toml")),
            Some(PathBuf::from("./sahara-scenario.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SAHARA_SCENARIO_TEMPLATES_DIR") {
            self.paths.templates_dir = PathBuf::from(dir);
        }
        if let Ok(command) = std::env::var("SAHARA_SCENARIO_TEST_RUNNER") {
            self.runner.command = command.split_whitespace().map(str::to_string).collect();
        }
        if let Ok(level) = std::env::var("SAHARA_SCENARIO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(dir) = std::env::var("SAHARA_SCENARIO_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.runner.command.is_empty() {
            return Err(Error::InvalidConfig(
                "test runner command cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}
