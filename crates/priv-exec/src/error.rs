// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the privileged execution channel.

/// Errors returned by an [`Executor`](crate::Executor).
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The shell process could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The command did not finish within the configured timeout.
    #[error("command timed out after {timeout_ms} ms: {command}")]
    Timeout { command: String, timeout_ms: u64 },

    /// The command ran but reported failure.
    #[error("command failed (exit {code:?}): {command}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The command line could not be tokenised.
    #[error("malformed command line: {0}")]
    Malformed(String),
}
