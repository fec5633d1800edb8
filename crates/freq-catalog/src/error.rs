// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for frequency sources.

use priv_exec::ExecError;

/// Why a single frequency source contributed nothing.
///
/// Catalog building never fails as a whole: each source swallows its own
/// `CatalogError` and contributes an empty set. The error is kept only for
/// diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: ExecError,
    },

    /// A file was read but held no frequency.
    #[error("no frequencies in {path}")]
    NoValues { path: String },

    /// No candidate location exists on this device.
    #[error("not present: {0}")]
    NotPresent(String),
}
