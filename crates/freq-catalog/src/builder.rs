// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Merges the six sources into one catalog per cluster.

use crate::parse::canonicalize;
use crate::sources::{FrequencySource, ReadContext};
use crate::{CatalogError, CatalogPaths};
use cpu_topology::{Cluster, Mhz, SysfsLayout};
use futures::future::join_all;
use priv_exec::Executor;
use std::fmt::Write as _;
use std::sync::Arc;

/// What one source contributed for one cluster.
#[derive(Debug)]
pub struct SourceContribution {
    pub source: FrequencySource,
    /// Range-filtered values, or the reason the source was empty.
    pub outcome: Result<Vec<Mhz>, CatalogError>,
}

impl SourceContribution {
    /// Values contributed; empty when the source failed.
    pub fn values(&self) -> &[Mhz] {
        self.outcome.as_deref().unwrap_or(&[])
    }
}

/// Builds the authoritative frequency list of a cluster.
pub struct CatalogBuilder {
    exec: Arc<dyn Executor>,
    layout: SysfsLayout,
    paths: CatalogPaths,
}

impl CatalogBuilder {
    pub fn new(exec: Arc<dyn Executor>, layout: SysfsLayout) -> Self {
        Self {
            exec,
            layout,
            paths: CatalogPaths::default(),
        }
    }

    pub fn with_paths(mut self, paths: CatalogPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn paths(&self) -> &CatalogPaths {
        &self.paths
    }

    /// Reads all six sources concurrently.
    pub async fn contributions(&self, cluster: &Cluster) -> Vec<SourceContribution> {
        let ctx = ReadContext {
            exec: self.exec.as_ref(),
            layout: &self.layout,
            paths: &self.paths,
            cluster,
        };
        let reads = FrequencySource::ALL.map(|source| {
            let ctx = &ctx;
            async move {
                let outcome = ctx
                    .read(source)
                    .await
                    .map(|values| admit(source, cluster, values));
                if let Err(e) = &outcome {
                    tracing::debug!(cluster = cluster.index, %source, "source empty: {e}");
                }
                SourceContribution { source, outcome }
            }
        });
        join_all(reads).await
    }

    /// Returns `original` merged with every source, sorted ascending,
    /// deduplicated and strictly positive.
    ///
    /// The result is a superset of `original` (minus zeros) and calling it
    /// again on its own output changes nothing.
    pub async fn enhance(&self, original: &[Mhz], cluster: &Cluster) -> Vec<Mhz> {
        let mut merged = original.to_vec();
        for contribution in self.contributions(cluster).await {
            if let Ok(values) = contribution.outcome {
                merged.extend(values);
            }
        }
        let merged = canonicalize(merged);
        tracing::debug!(
            cluster = cluster.index,
            before = original.len(),
            after = merged.len(),
            "frequency catalog enhanced"
        );
        merged
    }

    /// Human-readable per-source dump for every cluster, starting from
    /// each cluster's detected (pre-merge) frequency list.
    pub async fn debug_report(&self, clusters: &[Cluster]) -> String {
        let mut out = String::new();
        for cluster in clusters {
            let _ = writeln!(
                out,
                "Cluster {} (cores {:?}, {}-{} MHz)",
                cluster.index, cluster.member_cores, cluster.min_freq, cluster.max_freq
            );
            let detected = &cluster.detected_frequencies;
            let _ = writeln!(out, "  {:<16} {:>3} {:?}", "detected", detected.len(), detected);
            let mut merged = detected.clone();
            for c in self.contributions(cluster).await {
                match &c.outcome {
                    Ok(values) => {
                        let values = canonicalize(values.clone());
                        let _ = writeln!(out, "  {:<16} {:>3} {:?}", c.source.name(), values.len(), values);
                        merged.extend(values);
                    }
                    Err(e) => {
                        let _ = writeln!(out, "  {:<16}   - ({e})", c.source.name());
                    }
                }
            }
            let merged = canonicalize(merged);
            let _ = writeln!(out, "  {:<16} {:>3} {:?}", "merged", merged.len(), merged);
        }
        out
    }
}

/// Applies the hardware-range filter to unkeyed sources.
fn admit(source: FrequencySource, cluster: &Cluster, values: Vec<Mhz>) -> Vec<Mhz> {
    let range_known = cluster.min_freq > 0 && cluster.min_freq <= cluster.max_freq;
    if source.is_cluster_keyed() || !range_known {
        return values;
    }
    values
        .into_iter()
        .filter(|f| (cluster.min_freq..=cluster.max_freq).contains(f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpu_topology::RawCluster;
    use priv_exec::FakeDevice;

    const CPU: &str = "/sys/devices/system/cpu";

    fn little() -> Cluster {
        RawCluster {
            member_cores: vec![0, 1],
            min_freq: 300_000,
            max_freq: 1_804_800,
            available_frequencies: vec![300_000, 1_804_800],
            ..Default::default()
        }
        .normalize(0)
    }

    fn device() -> FakeDevice {
        FakeDevice::new()
            // 1. hardware limits
            .with_file(&format!("{CPU}/cpu0/cpufreq/cpuinfo_max_freq"), "1804800")
            .with_file(&format!("{CPU}/cpu0/cpufreq/cpuinfo_min_freq"), "300000")
            // 2. OPP
            .with_file(
                "/sys/kernel/debug/opp/cpu1/opp_summary",
                " 403200000 Hz 580000 uV\n 1113600000 Hz 700000 uV\n",
            )
            // 3. policy
            .with_file(
                &format!("{CPU}/cpufreq/policy0/scaling_available_frequencies"),
                "300000 576000 768000 1804800",
            )
            .with_file(&format!("{CPU}/cpufreq/policy0/scaling_boost_frequencies"), "1900800")
            // 4. devfreq, partly outside the cluster range
            .with_file(
                "/sys/class/devfreq/cluster0/available_frequencies",
                "300000000 940800000 2841600000",
            )
            // 5. time in state
            .with_file(
                &format!("{CPU}/cpu0/cpufreq/stats/time_in_state"),
                "300000 10\n1497600 3\n",
            )
            // 6. cooling devices
            .with_file("/sys/class/thermal/cooling_device0/type", "cpufreq-cpu0")
            .with_file(
                "/sys/class/thermal/cooling_device0/available_frequencies",
                "1209600 5000000",
            )
            .with_file("/sys/class/thermal/cooling_device1/type", "battery")
            .with_file(
                "/sys/class/thermal/cooling_device1/available_frequencies",
                "999000",
            )
    }

    fn builder(dev: FakeDevice) -> CatalogBuilder {
        CatalogBuilder::new(Arc::new(dev), SysfsLayout::system())
    }

    #[tokio::test]
    async fn test_all_sources_contribute() {
        let b = builder(device());
        let cluster = little();
        let contributions = b.contributions(&cluster).await;
        assert_eq!(contributions.len(), 6);
        for c in &contributions {
            assert!(c.outcome.is_ok(), "{} failed: {:?}", c.source, c.outcome);
        }
        let by = |s: FrequencySource| {
            contributions
                .iter()
                .find(|c| c.source == s)
                .map(|c| c.values().to_vec())
                .unwrap()
        };
        assert_eq!(by(FrequencySource::OppTable), vec![403, 1113]);
        // 2841 MHz is outside this cluster's range.
        assert_eq!(by(FrequencySource::Devfreq), vec![300, 940]);
        assert_eq!(by(FrequencySource::CoolingDevices), vec![1209]);
    }

    #[tokio::test]
    async fn test_enhance_merges_sorted_unique() {
        let b = builder(device());
        let cluster = little();
        let out = b.enhance(&cluster.available_frequencies, &cluster).await;
        assert_eq!(
            out,
            vec![300, 403, 576, 768, 940, 1113, 1209, 1497, 1804, 1900]
        );
    }

    #[tokio::test]
    async fn test_enhance_is_superset_and_idempotent() {
        let b = builder(device());
        let cluster = little();
        let original = vec![1804, 300, 555];
        let once = b.enhance(&original, &cluster).await;
        for f in &original {
            assert!(once.contains(f));
        }
        let twice = b.enhance(&once, &cluster).await;
        assert_eq!(once, twice);
        assert!(once.windows(2).all(|w| w[0] < w[1]));
        assert!(once.iter().all(|&f| f > 0));
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_empty() {
        let b = builder(FakeDevice::new());
        let cluster = little();
        assert!(b.enhance(&[], &cluster).await.is_empty());
        assert!(b
            .contributions(&cluster)
            .await
            .iter()
            .all(|c| c.outcome.is_err()));
    }

    #[tokio::test]
    async fn test_enhance_drops_zero_from_original() {
        let b = builder(FakeDevice::new());
        assert_eq!(b.enhance(&[0, 600, 600], &little()).await, vec![600]);
    }

    #[tokio::test]
    async fn test_custom_devfreq_template() {
        let dev = FakeDevice::new().with_file("/vendor/cl0/freqs", "576000 768000");
        let paths = CatalogPaths {
            devfreq_templates: vec!["/vendor/cl{cluster}/freqs".into()],
            ..Default::default()
        };
        let b = builder(dev).with_paths(paths);
        let out = b.enhance(&[], &little()).await;
        assert_eq!(out, vec![576, 768]);
    }

    #[tokio::test]
    async fn test_debug_report_mentions_every_source() {
        let b = builder(device());
        let report = b.debug_report(&[little()]).await;
        for source in FrequencySource::ALL {
            assert!(report.contains(source.name()));
        }
        assert!(report.contains("merged"));
        assert!(report.contains("Cluster 0"));
    }

    #[tokio::test]
    async fn test_debug_report_starts_from_detected_list() {
        let b = builder(device());
        let mut cluster = little();
        cluster.available_frequencies = b.enhance(&cluster.available_frequencies, &cluster).await;
        let report = b.debug_report(&[cluster]).await;

        let row = |label: &str| {
            report
                .lines()
                .find(|l| l.trim_start().starts_with(label))
                .unwrap()
                .to_string()
        };
        assert!(row("detected").ends_with("[300, 1804]"));
        assert!(row("merged").contains("1113"));
    }
}
