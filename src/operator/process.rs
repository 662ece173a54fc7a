// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! External process execution
//!
//! Exit status 0 is success. Anything else is a [`GenoflowError::CommandFailed`]
//! carrying the captured standard error.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::errors::{GenoflowError, GenoflowResult};

/// Lines of stderr kept in a failure report
const STDERR_TAIL_LINES: usize = 40;

/// Captured output of a finished process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Run `command` through `shell -c`
pub async fn run_shell(
    shell: &str,
    command: &str,
    working_dir: &Path,
    env: &HashMap<String, String>,
) -> GenoflowResult<ProcessOutput> {
    let start = Instant::now();

    let mut cmd = Command::new(shell);
    cmd.arg("-c").arg(command);
    cmd.current_dir(working_dir);
    cmd.envs(env);
    cmd.kill_on_drop(true);

    tracing::debug!(%shell, %command, "spawning process");

    let output = cmd.output().await.map_err(|e| GenoflowError::ToolExecutionFailed {
        tool: shell.to_string(),
        error: e.to_string(),
        help: Some(format!("Shell '{}' may not be available", shell)),
    })?;

    let duration = start.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if output.status.success() {
        Ok(ProcessOutput {
            stdout,
            stderr,
            duration,
        })
    } else {
        Err(GenoflowError::CommandFailed {
            command: command.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: tail(&stderr, STDERR_TAIL_LINES),
        })
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
