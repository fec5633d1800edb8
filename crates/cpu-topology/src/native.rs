// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! In-process enumeration of cpufreq policies.
//!
//! Reads `/sys/devices/system/cpu/cpufreq/policyN/` directly instead of
//! spawning one shell per file. Each policy directory is one cluster;
//! `related_cpus` (or `affected_cpus`) lists its members. Values are
//! returned as [`RawCluster`]s and normalised afterwards, since some
//! kernels report MHz here and most report kHz.

use crate::model::parse_cpu_list;
use crate::{Cluster, RawCluster, SysfsLayout, TopologySource};
use std::path::Path;

/// Accelerated topology source backed by direct file reads.
#[derive(Debug, Clone)]
pub struct NativeSysfsSource {
    layout: SysfsLayout,
}

impl NativeSysfsSource {
    pub fn new(layout: SysfsLayout) -> Self {
        Self { layout }
    }
}

#[async_trait::async_trait]
impl TopologySource for NativeSysfsSource {
    fn name(&self) -> &str {
        "native-sysfs"
    }

    async fn try_detect(&self) -> Option<Vec<Cluster>> {
        let root = self.layout.cpufreq_root();
        let raw = tokio::task::spawn_blocking(move || read_policies(Path::new(&root)))
            .await
            .ok()??;
        Some(index_clusters(raw))
    }
}

/// Sorts raw clusters by max frequency (then first core) and normalises them.
pub(crate) fn index_clusters(mut raw: Vec<RawCluster>) -> Vec<Cluster> {
    raw.sort_by_key(|r| (r.max_freq, r.member_cores.iter().min().copied()));
    raw.into_iter()
        .enumerate()
        .map(|(index, r)| r.normalize(index))
        .collect()
}

/// Reads every `policyN` directory below `root`.
///
/// Returns `None` if the directory is missing, holds no policy, or any
/// policy lacks its member list or maximum frequency.
fn read_policies(root: &Path) -> Option<Vec<RawCluster>> {
    let entries = std::fs::read_dir(root).ok()?;

    let mut policy_dirs: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with("policy") && name[6..].chars().all(|c| c.is_ascii_digit())
        })
        .map(|e| e.path())
        .collect();
    policy_dirs.sort();

    if policy_dirs.is_empty() {
        tracing::debug!("no cpufreq policies under {}", root.display());
        return None;
    }

    // A half-readable policy would orphan its cores; let the fallback handle it.
    let mut clusters = Vec::with_capacity(policy_dirs.len());
    for dir in &policy_dirs {
        match read_policy(dir) {
            Some(raw) => clusters.push(raw),
            None => {
                tracing::debug!("unreadable cpufreq policy {}", dir.display());
                return None;
            }
        }
    }
    Some(clusters)
}

fn read_policy(dir: &Path) -> Option<RawCluster> {
    let member_cores = read_trimmed(&dir.join("related_cpus"))
        .or_else(|| read_trimmed(&dir.join("affected_cpus")))
        .and_then(|s| parse_cpu_list(&s))?;

    let max_freq = read_number(&dir.join("cpuinfo_max_freq"))?;

    Some(RawCluster {
        member_cores,
        min_freq: read_number(&dir.join("cpuinfo_min_freq")).unwrap_or(0),
        max_freq,
        current_min_freq: read_number(&dir.join("scaling_min_freq")).unwrap_or(0),
        current_max_freq: read_number(&dir.join("scaling_max_freq")).unwrap_or(0),
        governor: read_trimmed(&dir.join("scaling_governor")),
        available_governors: read_words(&dir.join("scaling_available_governors")),
        available_frequencies: read_words(&dir.join("scaling_available_frequencies"))
            .iter()
            .filter_map(|w| w.parse().ok())
            .collect(),
    })
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_number(path: &Path) -> Option<u64> {
    read_trimmed(path)?.parse().ok()
}

fn read_words(path: &Path) -> Vec<String> {
    read_trimmed(path)
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_policy(root: &Path, n: u32, related: &str, min: u64, max: u64, freqs: &str) {
        let dir = root.join(format!("sys/devices/system/cpu/cpufreq/policy{n}"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("related_cpus"), format!("{related}\n")).unwrap();
        std::fs::write(dir.join("cpuinfo_min_freq"), format!("{min}\n")).unwrap();
        std::fs::write(dir.join("cpuinfo_max_freq"), format!("{max}\n")).unwrap();
        std::fs::write(dir.join("scaling_min_freq"), format!("{min}\n")).unwrap();
        std::fs::write(dir.join("scaling_max_freq"), format!("{max}\n")).unwrap();
        std::fs::write(dir.join("scaling_governor"), "schedutil\n").unwrap();
        std::fs::write(
            dir.join("scaling_available_governors"),
            "schedutil performance powersave\n",
        )
        .unwrap();
        std::fs::write(dir.join("scaling_available_frequencies"), format!("{freqs}\n")).unwrap();
    }

    #[tokio::test]
    async fn test_detects_three_clusters_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        // Written out of order on purpose.
        write_policy(tmp.path(), 7, "7", 844_800, 2_841_600, "844800 2841600");
        write_policy(tmp.path(), 0, "0 1 2 3", 300_000, 1_804_800, "300000 1804800");
        write_policy(tmp.path(), 4, "4 5 6", 710_400, 2_419_200, "710400 2419200");

        let source = NativeSysfsSource::new(SysfsLayout::new(tmp.path()));
        let clusters = source.try_detect().await.unwrap();

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].member_cores, vec![0, 1, 2, 3]);
        assert_eq!(clusters[1].member_cores, vec![4, 5, 6]);
        assert_eq!(clusters[2].member_cores, vec![7]);
        assert_eq!(clusters[2].max_freq, 2841);
        assert_eq!(clusters[2].available_frequencies, vec![844, 2841]);
        assert_eq!(clusters[1].index, 1);
    }

    #[tokio::test]
    async fn test_mhz_kernel_is_not_divided() {
        let tmp = tempfile::tempdir().unwrap();
        write_policy(tmp.path(), 0, "0-3", 600, 1800, "600 1200 1800");
        let source = NativeSysfsSource::new(SysfsLayout::new(tmp.path()));
        let clusters = source.try_detect().await.unwrap();
        assert_eq!(clusters[0].max_freq, 1800);
        assert_eq!(clusters[0].available_frequencies, vec![600, 1200, 1800]);
    }

    #[tokio::test]
    async fn test_missing_tree_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        let source = NativeSysfsSource::new(SysfsLayout::new(tmp.path()));
        assert!(source.try_detect().await.is_none());
    }

    #[tokio::test]
    async fn test_unreadable_policy_rejects_whole_result() {
        let tmp = tempfile::tempdir().unwrap();
        write_policy(tmp.path(), 0, "0 1", 300_000, 1_804_800, "");
        let broken = tmp.path().join("sys/devices/system/cpu/cpufreq/policy2");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join("related_cpus"), "2 3\n").unwrap();

        let source = NativeSysfsSource::new(SysfsLayout::new(tmp.path()));
        assert!(source.try_detect().await.is_none());
    }
}
