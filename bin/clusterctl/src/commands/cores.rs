// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `clusterctl cores`: online state and current frequency per core.

use cluster_control::ClusterService;

pub async fn execute(service: &ClusterService) -> anyhow::Result<()> {
    super::header("Core Status");

    let cores = service.get_all_core_info().await;
    if cores.is_empty() {
        anyhow::bail!("no cores found");
    }
    println!("  {:<6} {:<8} {:<9} {:>10}", "Core", "Cluster", "State", "Freq");
    println!("  {}", "-".repeat(36));
    for core in &cores {
        let state = if core.is_online { "online" } else { "offline" };
        let freq = if core.is_online {
            format!("{} MHz", core.current_freq)
        } else {
            "-".to_string()
        };
        println!(
            "  cpu{:<3} {:<8} {:<9} {:>10}",
            core.core_number, core.cluster_index, state, freq
        );
    }
    let online = cores.iter().filter(|c| c.is_online).count();
    println!();
    println!("  {online}/{} cores online", cores.len());
    Ok(())
}
