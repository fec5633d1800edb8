// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-core online state and current frequency.

use crate::units::to_mhz_by_magnitude;
use crate::{Cluster, Core, SysfsLayout};
use futures::future::join_all;
use priv_exec::{read_file, read_u64, Executor};

/// Reads the state of every member core of `clusters`, concurrently.
///
/// A missing `online` file means the core cannot be hot-plugged (usually
/// cpu0) and is online. Offline or unreadable cores report 0 MHz.
pub async fn read_core_info(
    exec: &dyn Executor,
    layout: &SysfsLayout,
    clusters: &[Cluster],
) -> Vec<Core> {
    let reads = clusters.iter().flat_map(|cluster| {
        cluster
            .member_cores
            .iter()
            .map(move |&core| read_core(exec, layout, core, cluster.index))
    });
    let mut cores = join_all(reads).await;
    cores.sort_by_key(|c| c.core_number);
    cores
}

async fn read_core(exec: &dyn Executor, layout: &SysfsLayout, core: u32, cluster_index: usize) -> Core {
    let is_online = match read_file(exec, &layout.online_file(core)).await {
        Ok(state) => state != "0",
        Err(_) => true,
    };
    let current_freq = if is_online {
        read_u64(exec, &layout.cpufreq_file(core, "scaling_cur_freq"))
            .await
            .map(to_mhz_by_magnitude)
            .unwrap_or(0)
    } else {
        0
    };
    Core {
        core_number: core,
        current_freq,
        is_online,
        cluster_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawCluster;
    use priv_exec::FakeDevice;

    #[tokio::test]
    async fn test_online_offline_and_missing() {
        let dev = FakeDevice::new()
            .with_file("/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq", "1209600")
            .with_file("/sys/devices/system/cpu/cpu1/online", "0")
            .with_file("/sys/devices/system/cpu/cpu1/cpufreq/scaling_cur_freq", "1209600")
            .with_file("/sys/devices/system/cpu/cpu4/online", "1");

        let clusters = vec![
            RawCluster {
                member_cores: vec![0, 1],
                max_freq: 1_804_800,
                ..Default::default()
            }
            .normalize(0),
            RawCluster {
                member_cores: vec![4],
                max_freq: 2_419_200,
                ..Default::default()
            }
            .normalize(1),
        ];

        let cores = read_core_info(&dev, &SysfsLayout::system(), &clusters).await;
        assert_eq!(cores.len(), 3);

        assert_eq!(cores[0].core_number, 0);
        assert!(cores[0].is_online);
        assert_eq!(cores[0].current_freq, 1209);

        assert!(!cores[1].is_online);
        assert_eq!(cores[1].current_freq, 0);

        // Online but scaling_cur_freq missing.
        assert!(cores[2].is_online);
        assert_eq!(cores[2].current_freq, 0);
        assert_eq!(cores[2].cluster_index, 1);
    }
}
