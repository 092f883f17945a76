//! External test runner

use sahara_common::{Error, Result};
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;

/// Full command line: the configured runner plus the concurrency option
pub fn build_command(runner: &[String], concurrency: Option<u32>) -> Result<Vec<String>> {
    if runner.is_empty() {
        return Err(Error::InvalidConfig(
            "test runner command cannot be empty".to_string(),
        ));
    }

    let mut command = runner.to_vec();
    if let Some(n) = concurrency {
        command.push(format!("--concurrency={}", n));
    }
    Ok(command)
}

/// Run the tests in `test_dir` and return the runner's exit code. A runner
/// killed by a signal counts as a failure.
pub async fn run_tests(runner: &[String], concurrency: Option<u32>, test_dir: &Path) -> Result<i32> {
    let command = build_command(runner, concurrency)?;
    tracing::info!(dir = %test_dir.display(), "Running {}", command.join(" "));

    let started = Instant::now();
    let status = Command::new(&command[0])
        .args(&command[1..])
        .current_dir(test_dir)
        .status()
        .await
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to start '{}': {}", command[0], e),
            ))
        })?;

    let code = status.code().unwrap_or(1);
    tracing::info!(
        code,
        elapsed = %crate::output::format_duration(started.elapsed().as_secs()),
        "Test runner finished"
    );
    Ok(code)
}
