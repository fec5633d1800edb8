// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `clusterctl debug-freq`: per-source frequency detection dump.

use cluster_control::ClusterService;

pub async fn execute(service: &ClusterService) -> anyhow::Result<()> {
    super::header("Frequency Sources");
    print!("{}", service.debug_frequency_detection().await);
    Ok(())
}
