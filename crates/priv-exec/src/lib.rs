// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # priv-exec
//!
//! The privileged command channel used to read and write cpufreq,
//! devfreq, and thermal nodes that an unprivileged process cannot touch.
//!
//! The channel is deliberately opaque: an [`Executor`] runs one line of
//! shell text and returns its stdout, or an [`ExecError`]. No ordering is
//! guaranteed between independently issued commands; callers that need
//! atomicity batch with [`command::all_of`].
//!
//! # Implementations
//! - [`ShellExecutor`]: `sh -c` / `su -c` child processes with a timeout.
//! - [`FakeDevice`]: an in-memory sysfs tree that interprets the
//!   [`command`] grammar, for tests and dry runs.
//!
//! # Example
//! ```no_run
//! use priv_exec::{read_file, ShellExecutor};
//!
//! # async fn example() -> Result<(), priv_exec::ExecError> {
//! let exec = ShellExecutor::su();
//! let gov = read_file(&exec, "/sys/devices/system/cpu/cpu0/cpufreq/scaling_governor").await?;
//! println!("governor: {gov}");
//! # Ok(())
//! # }
//! ```

pub mod command;
mod error;
mod fake;
mod shell;

pub use error::ExecError;
pub use fake::FakeDevice;
pub use shell::{ShellExecutor, ShellKind};

/// Runs a single line of shell text with whatever privilege the
/// implementation holds.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Executes `command`, returning captured stdout on success.
    async fn execute(&self, command: &str) -> Result<String, ExecError>;
}

/// Reads a file and returns its trimmed content.
pub async fn read_file(exec: &dyn Executor, path: &str) -> Result<String, ExecError> {
    exec.execute(&command::cat(path))
        .await
        .map(|s| s.trim().to_string())
}

/// Reads a file holding a single unsigned integer.
pub async fn read_u64(exec: &dyn Executor, path: &str) -> Option<u64> {
    read_file(exec, path).await.ok()?.parse().ok()
}

/// Writes `value` into `path`.
pub async fn write_file(exec: &dyn Executor, path: &str, value: &str) -> Result<(), ExecError> {
    exec.execute(&command::echo_to(path, value)).await.map(|_| ())
}

/// Returns `true` if `path` exists. Any failure counts as absence.
pub async fn path_exists(exec: &dyn Executor, path: &str) -> bool {
    exec.execute(&command::test_exists(path)).await.is_ok()
}

/// Lists the entries of a directory.
pub async fn list_dir(exec: &dyn Executor, path: &str) -> Result<Vec<String>, ExecError> {
    let out = exec.execute(&command::ls(path)).await?;
    Ok(out
        .split_whitespace()
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_helpers_against_fake() {
        let dev = FakeDevice::new()
            .with_file("/sys/class/thermal/cooling_device0/type", "cpufreq-cpu0\n")
            .with_file("/sys/class/thermal/cooling_device1/type", "battery\n")
            .with_file("/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq", "1804800\n");

        assert_eq!(
            list_dir(&dev, "/sys/class/thermal").await.unwrap(),
            vec!["cooling_device0", "cooling_device1"]
        );
        assert_eq!(
            read_u64(&dev, "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq").await,
            Some(1_804_800)
        );
        assert!(path_exists(&dev, "/sys/devices/system/cpu/cpu0").await);
        assert!(!path_exists(&dev, "/sys/devices/system/cpu/cpu1").await);
        assert_eq!(read_u64(&dev, "/sys/class/thermal/cooling_device1/type").await, None);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dev = FakeDevice::new().with_file("/a/scaling_max_freq", "2000000");
        write_file(&dev, "/a/scaling_max_freq", "1500000").await.unwrap();
        assert_eq!(read_file(&dev, "/a/scaling_max_freq").await.unwrap(), "1500000");
    }

    #[tokio::test]
    async fn test_dyn_executor() {
        let exec: std::sync::Arc<dyn Executor> =
            std::sync::Arc::new(FakeDevice::new().with_file("/x", "1"));
        assert_eq!(read_u64(exec.as_ref(), "/x").await, Some(1));
    }
}
