// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and the setup they share.

pub mod config;
pub mod cores;
pub mod debug;
pub mod detect;
pub mod freq;
pub mod lock;
pub mod status;
pub mod temp;

use cluster_control::{ClusterService, ControlConfig};
use priv_exec::FakeDevice;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins when no `-v` is given.
pub fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_target(false).init();
}

/// Reads the config file if given, defaults otherwise.
///
/// A dry run never touches the real lock file and reads everything
/// through the simulated device.
pub fn load_config(path: Option<&Path>, dry_run: bool) -> anyhow::Result<ControlConfig> {
    let mut config = match path {
        Some(p) => ControlConfig::from_file(p)
            .map_err(|e| anyhow::anyhow!("failed to load config '{}': {e}", p.display()))?,
        None => ControlConfig::default(),
    };
    if dry_run {
        config.native_probe = false;
        config.sysfs_root = "/".into();
        config.lock_state_path = None;
    }
    Ok(config)
}

pub fn build_service(config: ControlConfig, dry_run: bool) -> ClusterService {
    if dry_run {
        tracing::info!("dry run: using a simulated 4+3+1 device");
        ClusterService::new(config, Arc::new(simulated_device()))
    } else {
        let exec = config.create_executor();
        ClusterService::new(config, exec)
    }
}

/// A phone-like octa-core: 4× little, 3× big, 1× prime.
fn simulated_device() -> FakeDevice {
    let dev = FakeDevice::new();
    let groups: [(std::ops::Range<u32>, u64, u64, &str); 3] = [
        (0..4, 300_000, 1_804_800, "300000 576000 768000 1017600 1248000 1497600 1804800"),
        (4..7, 710_400, 2_419_200, "710400 1497600 1920000 2419200"),
        (7..8, 844_800, 2_841_600, "844800 1497600 1920000 2265600 2841600"),
    ];
    for (cores, min, max, freqs) in groups {
        for core in cores {
            let f = |name: &str| format!("/sys/devices/system/cpu/cpu{core}/cpufreq/{name}");
            dev.set_file(&f("cpuinfo_min_freq"), min.to_string());
            dev.set_file(&f("cpuinfo_max_freq"), max.to_string());
            dev.set_file(&f("scaling_min_freq"), min.to_string());
            dev.set_file(&f("scaling_max_freq"), max.to_string());
            dev.set_file(&f("scaling_cur_freq"), max.to_string());
            dev.set_file(&f("scaling_governor"), "schedutil");
            dev.set_file(&f("scaling_available_governors"), "schedutil performance powersave");
            dev.set_file(&f("scaling_available_frequencies"), freqs);
            dev.set_file(&format!("/sys/devices/system/cpu/cpu{core}/online"), "1");
        }
    }
    dev.set_file("/sys/class/thermal/thermal_zone0/type", "cpu-thermal");
    dev.set_file("/sys/class/thermal/thermal_zone0/temp", "48500");
    dev
}

/// Prints the three-line title box.
pub fn header(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║{:^54}║", format!("clusterctl · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_device_detects_three_clusters() {
        let config = load_config(None, true).unwrap();
        let service = build_service(config, true);
        let clusters = service.detect_clusters().await;
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[2].member_cores, vec![7]);
    }

    #[test]
    fn test_dry_run_never_persists() {
        let config = load_config(None, true).unwrap();
        assert!(config.lock_state_path.is_none());
        assert!(!config.native_probe);
    }
}
