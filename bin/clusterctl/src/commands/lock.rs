// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `clusterctl lock`, `unlock` and `enforce`.

use cluster_control::{ClusterService, EnforceAction, EnforceReport, LockPolicy};
use cpu_topology::Mhz;
use std::time::Duration;

pub async fn lock(
    service: &ClusterService,
    cluster: usize,
    min: Mhz,
    max: Mhz,
    thermal_max: Option<f32>,
) -> anyhow::Result<()> {
    let policy = match thermal_max {
        Some(max_temp) => LockPolicy::ThermalAdaptive { max_temp },
        None => LockPolicy::Manual,
    };
    let report = service.lock_cluster_frequency(cluster, min, max, policy).await?;
    println!(
        "cluster {cluster}: locked to {min}-{max} MHz (observed {}-{} MHz, {} poll(s))",
        report.observed_min, report.observed_max, report.attempts
    );
    if let LockPolicy::ThermalAdaptive { max_temp } = policy {
        println!("  ceiling lowers while the CPU is at or above {max_temp:.1} C");
    }
    Ok(())
}

pub async fn unlock(service: &ClusterService, cluster: usize) -> anyhow::Result<()> {
    service.unlock_cluster_frequency(cluster).await?;
    println!("cluster {cluster}: unlocked, hardware bounds restored");
    Ok(())
}

pub async fn enforce(service: &ClusterService, every: Option<u64>) -> anyhow::Result<()> {
    let Some(secs) = every else {
        print_report(&service.enforce_locks().await?);
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => match service.enforce_locks().await {
                Ok(report) => print_report(&report),
                Err(e) => tracing::error!("enforcement pass failed: {e}"),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping enforcement");
                return Ok(());
            }
        }
    }
}

fn print_report(report: &EnforceReport) {
    if report.actions.is_empty() {
        println!("no active locks");
        return;
    }
    if let Some(t) = report.temperature {
        let note = if report.throttling { " (throttling)" } else { "" };
        println!("CPU {t:.1} C{note}");
    }
    for (cluster, action) in &report.actions {
        println!("  cluster {cluster}: {}", describe(action));
    }
}

fn describe(action: &EnforceAction) -> String {
    match action {
        EnforceAction::InSync => "in sync".to_string(),
        EnforceAction::Reapplied { min, max } => format!("re-applied {min}-{max} MHz"),
        EnforceAction::Throttled { min, max } => format!("throttled to {min}-{max} MHz"),
        EnforceAction::BudgetExhausted => "drifted, retry budget exhausted".to_string(),
        EnforceAction::Failed(e) => format!("failed: {e}"),
        EnforceAction::ClusterMissing => "cluster no longer detected".to_string(),
    }
}
