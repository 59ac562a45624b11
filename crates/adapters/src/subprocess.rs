// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use crate::activity::ActivityError;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Safety-net timeout for git commands.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Safety-net timeout for terraform commands.
///
/// The orchestrator's per-activity budget is normally tighter; this only
/// bounds a call made outside of it.
pub const TERRAFORM_TIMEOUT: Duration = Duration::from_secs(3600);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child is
/// killed if the future is dropped, whether by this timeout or by a
/// caller-side one.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.kill_on_drop(true);
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

/// Combined output of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: text,
        }
    }
}

/// Build a command from a program and argument list, returning it together
/// with its printable form.
pub fn command_line(program: &str, args: &[String]) -> (Command, String) {
    let mut cmd = Command::new(program);
    cmd.args(args);
    let mut display = program.to_string();
    for arg in args {
        display.push(' ');
        display.push_str(arg);
    }
    (cmd, display)
}

/// Run `cmd` to completion and return its combined output.
///
/// `redact` is applied to both the printable command and the output before
/// they are logged or placed in an error.
pub(crate) async fn run_checked(
    cmd: Command,
    display: &str,
    timeout: Duration,
    redact: impl Fn(&str) -> String,
) -> Result<String, ActivityError> {
    let command = redact(display);
    let output: CommandOutput = run_with_timeout(cmd, timeout, &command)
        .await
        .map_err(|e| ActivityError::Process(redact(&e)))?
        .into();
    let text = redact(&output.output);
    if !output.success {
        tracing::warn!(command, exit_code = ?output.exit_code, "command failed");
        return Err(ActivityError::Command {
            command,
            exit_code: output.exit_code,
            output: text,
        });
    }
    tracing::debug!(command, "command finished");
    Ok(text)
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
