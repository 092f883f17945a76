//! Sahara scenario test runner
//!
//! Merges scenario files into one configuration, validates it and generates
//! a test case file for the external test runner.

pub mod auth;
pub mod defaults;
pub mod execution;
pub mod files;
pub mod logging;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod settings;
pub mod template;
pub mod testcase;
pub mod validation;
pub mod variables;

pub use pipeline::{prepare, run, RunOptions};
pub use settings::RunnerSettings;
