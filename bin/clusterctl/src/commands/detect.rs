// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `clusterctl detect`: list clusters with their frequency catalogs.

use cluster_control::ClusterService;

pub async fn execute(service: &ClusterService, json: bool) -> anyhow::Result<()> {
    let clusters = service.detect_clusters().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&clusters)?);
        return Ok(());
    }

    super::header("Cluster Topology");
    if clusters.is_empty() {
        anyhow::bail!("no CPU clusters detected (is cpufreq available?)");
    }

    println!(
        "  {:<3} {:<14} {:>11} {:>11} {:<12} {:>5}",
        "#", "Cores", "Hardware", "Active", "Governor", "OPPs",
    );
    println!("  {}", "-".repeat(62));
    for c in &clusters {
        println!(
            "  {:<3} {:<14} {:>11} {:>11} {:<12} {:>5}",
            c.index,
            format!("{:?}", c.member_cores),
            format!("{}-{}", c.min_freq, c.max_freq),
            format!("{}-{}", c.current_min_freq, c.current_max_freq),
            c.governor,
            c.available_frequencies.len(),
        );
    }
    println!();

    for c in &clusters {
        println!("  Cluster {} frequencies (MHz):", c.index);
        println!("   {:?}", c.available_frequencies);
        println!("   governors: {}", c.available_governors.join(" "));
    }
    Ok(())
}
