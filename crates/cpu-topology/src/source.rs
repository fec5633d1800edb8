// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`TopologySource`] trait.

use crate::Cluster;

/// One way of enumerating clusters.
///
/// The detector tries its sources in order; a source signals "use the
/// next one" by returning `None` or an empty list. Implementations swallow
/// their own read failures.
#[async_trait::async_trait]
pub trait TopologySource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Enumerates clusters, indexed in ascending max-frequency order.
    async fn try_detect(&self) -> Option<Vec<Cluster>>;
}
