//! Shell command execution.

use aish_core::{CommandRunner, ExecError};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Runs one command line through the platform shell with the ambient
/// privileges of the process. No sandboxing, no allow-list.
#[derive(Debug, Default, Clone)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellExecutor {
    async fn run(&self, command: &str) -> Result<String, ExecError> {
        debug!("executing: {}", command);
        let output = shell_command(command)
            .output()
            .await
            .map_err(|e| ExecError(e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                Err(ExecError(format!("command exited with {}", output.status)))
            } else {
                Err(ExecError(stderr))
            }
        }
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}
