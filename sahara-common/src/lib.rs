//! Common types and errors shared by the scenario runner crates

pub mod scenario;

use std::path::PathBuf;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Scenario file not found: {}", .0.display())]
    ScenarioNotFound(PathBuf),

    #[error("Please, specify version for plugin '{0}' via '-v'")]
    MissingPluginVersion(String),

    #[error("Undefined template variable '{name}' in {file}")]
    UndefinedVariable { name: String, file: String },

    #[error("Template error in {file}: {message}")]
    Template { file: String, message: String },

    #[error("Invalid YAML in {file}: {message}")]
    Yaml { file: String, message: String },

    #[error("Sections {section} is different (conflicting value for '{key}')")]
    ConflictingSection { section: String, key: String },

    #[error("Job flow exist: '{0}' is defined more than once")]
    DuplicateJobFlow(String),

    #[error("Unknown job flow '{job}' referenced by cluster {cluster}")]
    UnknownJobFlow { job: String, cluster: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
