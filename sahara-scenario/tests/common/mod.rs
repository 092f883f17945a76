//! Common test utilities and helpers

#![allow(dead_code)]

use sahara_common::Error;
use sahara_scenario::{RunOptions, RunnerSettings};
use std::path::{Path, PathBuf};

/// Path of a file under tests/fixtures
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Settings using the templates shipped with the crate
pub fn settings() -> RunnerSettings {
    RunnerSettings::default()
}

/// Settings whose test runner is a shell script run in the test directory
pub fn settings_with_runner(script: &str) -> RunnerSettings {
    let mut settings = RunnerSettings::default();
    settings.runner.command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
    settings
}

/// Options for the given scenario files
pub fn options(files: &[PathBuf]) -> RunOptions {
    RunOptions {
        scenario_arguments: files.to_vec(),
        ..Default::default()
    }
}

/// Options selecting a default plugin template
pub fn plugin_options(plugin: &str, version: Option<&str>, release: Option<&str>) -> RunOptions {
    RunOptions {
        plugin: Some(plugin.to_string()),
        plugin_version: version.map(str::to_string),
        release: release.map(str::to_string),
        ..Default::default()
    }
}

pub fn args(pairs: &[&str]) -> Vec<String> {
    pairs.iter().map(|s| s.to_string()).collect()
}

/// The pipeline error behind an anyhow chain
pub fn root_error(err: &anyhow::Error) -> Option<&Error> {
    err.chain().find_map(|e| e.downcast_ref::<Error>())
}

/// Write `content` to `name` inside `dir`
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}
