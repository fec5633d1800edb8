// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Writes frequency bounds and governors to every core of a cluster.
//!
//! The kernel rejects a `scaling_min_freq` above the current
//! `scaling_max_freq` and vice versa, so the write order per core depends
//! on the direction of the change: when the new maximum is above the
//! current one, the maximum goes first; otherwise the minimum does.
//!
//! A write returning success does not mean the hardware applied it. Use
//! the [`Verifier`](crate::Verifier) to confirm.

use crate::{ClusterCache, ControlError};
use cpu_topology::units::mhz_to_khz;
use cpu_topology::{Cluster, Mhz, SysfsLayout};
use futures::future::join_all;
use priv_exec::{command, Executor};
use std::sync::Arc;

/// Issues cpufreq writes for whole clusters.
pub struct FrequencyController {
    exec: Arc<dyn Executor>,
    layout: SysfsLayout,
    cache: Arc<ClusterCache>,
}

impl FrequencyController {
    pub fn new(exec: Arc<dyn Executor>, layout: SysfsLayout, cache: Arc<ClusterCache>) -> Self {
        Self {
            exec,
            layout,
            cache,
        }
    }

    async fn resolve(&self, index: usize) -> Result<Cluster, ControlError> {
        self.cache
            .cluster(index)
            .await
            .ok_or(ControlError::ClusterNotFound(index))
    }

    /// Sets the scaling bounds of every member core of a cluster.
    pub async fn set_frequency(&self, index: usize, min: Mhz, max: Mhz) -> Result<(), ControlError> {
        let cluster = self.resolve(index).await?;
        if min > max {
            return Err(ControlError::InvalidRange { min, max });
        }
        if min < cluster.min_freq || max > cluster.max_freq {
            tracing::warn!(
                cluster = index,
                "requested {min}-{max} MHz outside hardware range {}-{} MHz; the kernel will clamp",
                cluster.min_freq,
                cluster.max_freq
            );
        }

        let raising = max > cluster.current_max_freq;
        let min_khz = mhz_to_khz(min).to_string();
        let max_khz = mhz_to_khz(max).to_string();

        let exec = self.exec.as_ref();
        let writes = cluster.member_cores.iter().map(|&core| {
            let min_path = self.layout.cpufreq_file(core, "scaling_min_freq");
            let max_path = self.layout.cpufreq_file(core, "scaling_max_freq");
            let min_cmd = command::echo_to(&min_path, &min_khz);
            let max_cmd = command::echo_to(&max_path, &max_khz);
            let batch = if raising {
                command::all_of([max_cmd, min_cmd])
            } else {
                command::all_of([min_cmd, max_cmd])
            };
            async move { exec.execute(&batch).await }
        });
        let results = join_all(writes).await;
        self.cache.invalidate();

        let failed = results.into_iter().filter_map(Result::err).next();
        match failed {
            None => {
                tracing::info!(cluster = index, min, max, "frequency bounds written");
                Ok(())
            }
            Some(e) => {
                tracing::warn!(cluster = index, "frequency write failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Sets the governor of every member core in one conjunctive command.
    pub async fn set_governor(&self, index: usize, governor: &str) -> Result<(), ControlError> {
        let cluster = self.resolve(index).await?;
        let batch = command::all_of(cluster.member_cores.iter().map(|&core| {
            command::echo_to(&self.layout.cpufreq_file(core, "scaling_governor"), governor)
        }));
        let result = self.exec.execute(&batch).await;
        self.cache.invalidate();

        match result {
            Ok(_) => {
                tracing::info!(cluster = index, governor, "governor written");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(cluster = index, governor, "governor write failed: {e}");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClusterProvider;
    use cpu_topology::RawCluster;
    use priv_exec::FakeDevice;

    const CPU: &str = "/sys/devices/system/cpu";

    /// Cores 2 and 3, hardware 300-1800 MHz, currently capped at 1000 MHz.
    struct Fixed;

    #[async_trait::async_trait]
    impl ClusterProvider for Fixed {
        async fn load(&self) -> Vec<Cluster> {
            vec![RawCluster {
                member_cores: vec![2, 3],
                min_freq: 300_000,
                max_freq: 1_800_000,
                current_min_freq: 300_000,
                current_max_freq: 1_000_000,
                ..Default::default()
            }
            .normalize(0)]
        }
    }

    fn device() -> FakeDevice {
        let dev = FakeDevice::new();
        for core in [2, 3] {
            for name in ["scaling_min_freq", "scaling_max_freq", "scaling_governor"] {
                dev.set_file(&format!("{CPU}/cpu{core}/cpufreq/{name}"), "0");
            }
        }
        dev
    }

    fn controller(dev: &FakeDevice) -> (Arc<ClusterCache>, FrequencyController) {
        let cache = Arc::new(ClusterCache::new(Arc::new(Fixed), crate::DEFAULT_TTL));
        let ctl = FrequencyController::new(Arc::new(dev.clone()), SysfsLayout::system(), cache.clone());
        (cache, ctl)
    }

    #[tokio::test]
    async fn test_raise_writes_max_first() {
        let dev = device();
        let (_, ctl) = controller(&dev);
        ctl.set_frequency(0, 1200, 1800).await.unwrap();
        let writes = dev.writes();
        assert_eq!(writes.len(), 4);
        assert!(writes[0].0.ends_with("cpu2/cpufreq/scaling_max_freq"));
        assert_eq!(writes[0].1, "1800000");
        assert!(writes[1].0.ends_with("cpu2/cpufreq/scaling_min_freq"));
        assert_eq!(writes[1].1, "1200000");
    }

    #[tokio::test]
    async fn test_lower_writes_min_first() {
        let dev = device();
        let (_, ctl) = controller(&dev);
        ctl.set_frequency(0, 300, 800).await.unwrap();
        let writes = dev.writes();
        assert!(writes[0].0.ends_with("cpu2/cpufreq/scaling_min_freq"));
        assert!(writes[1].0.ends_with("cpu2/cpufreq/scaling_max_freq"));
    }

    #[tokio::test]
    async fn test_out_of_range_request_is_still_written() {
        let dev = device();
        let (_, ctl) = controller(&dev);
        ctl.set_frequency(0, 100, 2500).await.unwrap();
        assert_eq!(
            dev.file(&format!("{CPU}/cpu3/cpufreq/scaling_max_freq")).as_deref(),
            Some("2500000")
        );
    }

    #[tokio::test]
    async fn test_errors_before_writing() {
        let dev = device();
        let (_, ctl) = controller(&dev);
        assert!(matches!(
            ctl.set_frequency(0, 900, 800).await,
            Err(ControlError::InvalidRange { .. })
        ));
        assert!(matches!(
            ctl.set_governor(4, "performance").await,
            Err(ControlError::ClusterNotFound(4))
        ));
        assert!(dev.writes().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_invalidate_cache() {
        let dev = device();
        let (cache, ctl) = controller(&dev);
        cache.get().await;
        ctl.set_governor(0, "performance").await.unwrap();
        assert!(!cache.is_fresh());
        cache.get().await;
        ctl.set_frequency(0, 300, 900).await.unwrap();
        assert!(!cache.is_fresh());
        assert_eq!(cache.detection_count(), 2);
    }

    #[tokio::test]
    async fn test_governor_is_one_command() {
        let dev = device();
        let (_, ctl) = controller(&dev);
        ctl.set_governor(0, "userspace").await.unwrap();
        let commands: Vec<_> = dev
            .commands()
            .into_iter()
            .filter(|c| c.contains("scaling_governor"))
            .collect();
        assert_eq!(commands.len(), 1);
        assert_eq!(dev.writes().len(), 2);
    }
}
