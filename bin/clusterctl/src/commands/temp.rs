// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `clusterctl temp`: thermal zones and the aggregated CPU temperature.

use cluster_control::ClusterService;

pub async fn execute(service: &ClusterService) -> anyhow::Result<()> {
    super::header("Thermal");

    let zones = service.thermal_zones().await;
    if zones.is_empty() {
        println!("  No readable thermal zones.");
    }
    for zone in &zones {
        println!("  {:<24} {:>6.1} C  {}", zone.name, zone.temp, temp_bar(zone.temp));
    }
    println!();

    let limit = service.config().thermal.max_temp;
    let temp = service.current_temperature().await;
    println!("  CPU temperature: {temp:.1} C (limit {limit:.1} C)");
    if temp >= limit {
        println!("  WARNING: above the configured limit");
    }
    Ok(())
}

/// Visual temperature bar on a 0-100 C scale.
pub fn temp_bar(celsius: f32) -> String {
    let filled = ((celsius / 100.0) * 20.0).round().clamp(0.0, 20.0) as usize;
    let symbol = if celsius >= 80.0 {
        "#"
    } else if celsius >= 60.0 {
        "="
    } else {
        "-"
    };
    format!("[{}{}]", symbol.repeat(filled), ".".repeat(20 - filled))
}
