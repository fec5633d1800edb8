// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `clusterctl set-freq`, `set-governor` and `verify`.

use cluster_control::ClusterService;
use cpu_topology::Mhz;

pub async fn set(service: &ClusterService, cluster: usize, min: Mhz, max: Mhz) -> anyhow::Result<()> {
    service.set_cluster_frequency(cluster, min, max).await?;
    println!("cluster {cluster}: wrote {min}-{max} MHz (not verified; see `clusterctl verify`)");
    Ok(())
}

pub async fn set_governor(service: &ClusterService, cluster: usize, governor: &str) -> anyhow::Result<()> {
    service.set_cluster_governor(cluster, governor).await?;
    println!("cluster {cluster}: governor is now {governor}");
    Ok(())
}

pub async fn verify(service: &ClusterService, cluster: usize, min: Mhz, max: Mhz) -> anyhow::Result<()> {
    let report = service.verify_cluster_frequency(cluster, min, max).await?;
    println!(
        "cluster {cluster}: active {}-{} MHz after {} poll(s) in {:.0?}",
        report.observed_min, report.observed_max, report.attempts, report.elapsed
    );
    Ok(())
}
