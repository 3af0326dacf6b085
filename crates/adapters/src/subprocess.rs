// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for package-manager install commands.
///
/// Installs can resolve and download; 10 minutes is a safety net for
/// slow mirrors.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Default timeout for list/outdated queries.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for environment probes (e.g. `poetry env info`).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

/// Combine captured stdout and stderr into the adapter-log format.
pub fn combined_output(output: &Output) -> String {
    format!(
        "STDOUT:\n{}\n\nSTDERR:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
