// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for topology detection.

/// Reasons a detected topology is rejected.
///
/// These never escape [`TopologyDetector::detect`](crate::TopologyDetector::detect):
/// a rejected result makes the detector move on to the next source.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TopologyError {
    /// A cluster has no member cores.
    #[error("cluster {index} has no member cores")]
    EmptyCluster { index: usize },

    /// A core was assigned to two clusters.
    #[error("core {core} belongs to both cluster {first} and cluster {second}")]
    DuplicateCore {
        core: u32,
        first: usize,
        second: usize,
    },

    /// Cluster indices are not `0..n` in position order.
    #[error("cluster at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: usize },

    /// Clusters are not ascending by maximum frequency.
    #[error("cluster {index} is out of max-frequency order")]
    Unordered { index: usize },
}
