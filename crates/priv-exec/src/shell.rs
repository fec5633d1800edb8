// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! [`ShellExecutor`]: runs command lines through `sh -c` or `su -c`.

use crate::{ExecError, Executor};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Which shell carries the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    /// Unprivileged `sh`; enough when the process already owns the sysfs nodes.
    Sh,
    /// `su -c`, for rooted devices.
    Su,
}

impl ShellKind {
    fn program(self) -> &'static str {
        match self {
            ShellKind::Sh => "sh",
            ShellKind::Su => "su",
        }
    }
}

/// Executes command lines in a child shell with a per-command timeout.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    kind: ShellKind,
    timeout: Duration,
}

impl ShellExecutor {
    /// Default per-command timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(kind: ShellKind, timeout: Duration) -> Self {
        Self { kind, timeout }
    }

    pub fn sh() -> Self {
        Self::new(ShellKind::Sh, Self::DEFAULT_TIMEOUT)
    }

    pub fn su() -> Self {
        Self::new(ShellKind::Su, Self::DEFAULT_TIMEOUT)
    }

    pub fn kind(&self) -> ShellKind {
        self.kind
    }
}

#[async_trait::async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, command: &str) -> Result<String, ExecError> {
        let program = self.kind.program();
        tracing::debug!(program, command, "exec");

        let mut cmd = Command::new(program);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ExecError::Timeout {
                command: command.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExecError::Failed {
                command: command.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_stdout() {
        let exec = ShellExecutor::sh();
        let out = exec.execute("echo hello").await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let exec = ShellExecutor::sh();
        let err = exec.execute("echo oops >&2; exit 3").await.unwrap_err();
        match err {
            ExecError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let exec = ShellExecutor::new(ShellKind::Sh, Duration::from_millis(50));
        let err = exec.execute("sleep 5").await.unwrap_err();
        assert!(matches!(err, ExecError::Timeout { timeout_ms: 50, .. }));
    }

    #[tokio::test]
    async fn test_reads_real_file_through_grammar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaling_governor");
        std::fs::write(&path, "schedutil\n").unwrap();

        let exec = ShellExecutor::sh();
        let value = crate::read_file(&exec, path.to_str().unwrap()).await.unwrap();
        assert_eq!(value, "schedutil");

        crate::write_file(&exec, path.to_str().unwrap(), "performance")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "performance");
    }
}
