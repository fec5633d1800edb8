// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for cluster control.

use cpu_topology::Mhz;

/// Errors that can occur while controlling cluster frequencies.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// No cluster with this index exists in the current topology.
    #[error("cluster {0} not found")]
    ClusterNotFound(usize),

    /// The cluster offers no governor that honours fixed bounds.
    #[error("cluster {cluster} has no lock-compatible governor (available: {available:?})")]
    IncompatibleGovernor {
        cluster: usize,
        available: Vec<String>,
    },

    /// Read-back never matched the requested bounds.
    #[error(
        "cluster {cluster} did not settle at {expected_min}-{expected_max} MHz after \
         {attempts} attempts (last read {actual_min}-{actual_max} MHz)"
    )]
    VerificationFailed {
        cluster: usize,
        expected_min: Mhz,
        expected_max: Mhz,
        actual_min: Mhz,
        actual_max: Mhz,
        attempts: u32,
    },

    /// Read-back never showed the requested governor.
    #[error("cluster {cluster} governor is '{actual}', expected '{expected}' after {attempts} attempts")]
    GovernorNotApplied {
        cluster: usize,
        expected: String,
        actual: String,
        attempts: u32,
    },

    /// The requested minimum exceeds the requested maximum.
    #[error("invalid frequency range: min {min} MHz > max {max} MHz")]
    InvalidRange { min: Mhz, max: Mhz },

    /// A privileged command failed.
    #[error("command error: {0}")]
    Exec(#[from] priv_exec::ExecError),

    /// The lock state could not be loaded or saved.
    #[error("lock store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
