// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `clusterctl status`: clusters, temperature and locks on one screen.

use super::temp::temp_bar;
use cluster_control::ClusterService;

pub async fn execute(service: &ClusterService) -> anyhow::Result<()> {
    super::header("Status");

    // ── Clusters ───────────────────────────────────────────────
    let clusters = service.detect_clusters().await;
    println!("  Clusters");
    if clusters.is_empty() {
        println!("   none detected");
    }
    for c in &clusters {
        println!("   {}", c.summary());
    }
    println!();

    // ── Thermal ────────────────────────────────────────────────
    let temp = service.current_temperature().await;
    let limit = service.config().thermal.max_temp;
    println!("  Thermal");
    println!("   CPU:          {temp:.1} C  {}", temp_bar(temp));
    println!("   Headroom:     {:.1} C to {limit:.1} C", limit - temp);
    println!();

    // ── Locks ──────────────────────────────────────────────────
    println!("  Locks");
    match service.lock_state()? {
        Some(state) if state.is_locked => {
            println!("   Policy:       {:?}", state.policy);
            for (cluster, target) in &state.targets {
                println!("   cluster {cluster}:    {}-{} MHz", target.min, target.max);
            }
            println!(
                "   Retries:      {} / {} this window",
                state.retry.count,
                service.config().retry.max_per_window
            );
        }
        _ => println!("   none"),
    }
    Ok(())
}
