// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for thermal monitoring.

use priv_exec::ExecError;

/// Errors that can occur when reading a thermal zone.
///
/// Zone readers skip zones that fail; these errors surface only from the
/// single-file helpers.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Failed to read a sysfs file directly.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to read a sysfs file through the executor.
    #[error("failed to read {path}: {source}")]
    ExecFailed {
        path: String,
        source: ExecError,
    },

    /// Failed to parse a numeric value from a system file.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// The expected sysfs path does not exist.
    #[error("sysfs path not found: {path}")]
    NotAvailable { path: String },
}
