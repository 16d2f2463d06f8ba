//! External command execution
//!
//! All hardware probing shells out to system utilities (`nvidia-smi`, `lspci`,
//! `nvcc`) and scrapes their stdout. This module owns that seam: a
//! [`CommandRunner`] trait so the probing layer never touches processes
//! directly, and a production [`ShellRunner`] that runs commands through
//! `sh -c` with a bounded wait.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

/// Default bound on how long a single probe command may run.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 3000;

/// Command execution errors
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to execute command: {0}")]
    ExecutionFailed(String),
    #[error("Command failed with exit code {0}")]
    NonZeroExit(i32),
    #[error("Timeout")]
    Timeout,
}

/// Runs a shell command line and captures its stdout.
///
/// Implementations must be safe to call from concurrent tasks. The command
/// string is passed to a shell verbatim, so pipelines are allowed.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<String, CommandError>;
}

/// Production runner backed by `sh -c`.
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<String, CommandError> {
        let result = timeout(
            self.timeout,
            Command::new("sh").arg("-c").arg(command).output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    // Signal-terminated processes carry no exit code
                    Err(CommandError::NonZeroExit(output.status.code().unwrap_or(-1)))
                }
            }
            Ok(Err(e)) => Err(CommandError::ExecutionFailed(e.to_string())),
            Err(_) => Err(CommandError::Timeout),
        }
    }
}
