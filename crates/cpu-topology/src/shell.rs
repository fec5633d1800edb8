// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shell-mediated topology probing, the fallback when policy directories
//! are missing or unreadable from this process.
//!
//! Clusters are defined operationally: cores whose `cpuinfo_max_freq`
//! values are equal are scaled identically, so they form one cluster. This
//! is a heuristic (two physically distinct clusters with equal ceilings
//! would merge) but it needs nothing beyond the per-core cpufreq files.
//!
//! Steps:
//! 1. Probe `cpu0..cpu{max_cores-1}` concurrently; keep existing nodes.
//! 2. Read each core's `cpuinfo_max_freq` concurrently; group by value.
//! 3. Read the remaining metadata from each cluster's first core only.
//! 4. Order clusters by their normalised max frequency; that order is the
//!    cluster index.
//!
//! A core whose `cpuinfo_max_freq` is unreadable is probed on its own. Its
//! ceiling is recovered from `scaling_max_freq` and the frequency list,
//! and it joins the cluster with the same ceiling, or stands alone when
//! none matches. Individual read failures fall back to defaults. Only
//! finding no cores at all is a failure.

use crate::{Cluster, RawCluster, SysfsLayout, TopologySource};
use futures::future::join_all;
use priv_exec::{path_exists, read_file, read_u64, Executor};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Highest number of cores probed by default.
pub const DEFAULT_MAX_CORES: u32 = 16;

/// Topology source that reads per-core cpufreq files through an [`Executor`].
pub struct ShellTopologySource {
    exec: Arc<dyn Executor>,
    layout: SysfsLayout,
    max_cores: u32,
}

impl ShellTopologySource {
    pub fn new(exec: Arc<dyn Executor>, layout: SysfsLayout) -> Self {
        Self {
            exec,
            layout,
            max_cores: DEFAULT_MAX_CORES,
        }
    }

    pub fn with_max_cores(mut self, max_cores: u32) -> Self {
        self.max_cores = max_cores;
        self
    }

    async fn discover_cores(&self) -> Vec<u32> {
        let exec = self.exec.as_ref();
        let probes = (0..self.max_cores).map(|core| {
            let node = self.layout.cpu_dir(core);
            async move { path_exists(exec, &node).await.then_some(core) }
        });
        join_all(probes).await.into_iter().flatten().collect()
    }

    async fn group_by_max_freq(&self, cores: &[u32]) -> BTreeMap<u64, Vec<u32>> {
        let exec = self.exec.as_ref();
        let reads = cores.iter().map(|&core| {
            let path = self.layout.cpufreq_file(core, "cpuinfo_max_freq");
            async move {
                let max = read_u64(exec, &path).await;
                if max.is_none() {
                    tracing::debug!(core, "cpuinfo_max_freq unreadable");
                }
                (core, max.unwrap_or(0))
            }
        });

        let mut groups: BTreeMap<u64, Vec<u32>> = BTreeMap::new();
        for (core, max) in join_all(reads).await {
            groups.entry(max).or_default().push(core);
        }
        groups
    }

    async fn read_cluster(&self, max_freq: u64, member_cores: Vec<u32>) -> RawCluster {
        let exec = self.exec.as_ref();
        let first = member_cores[0];
        let min_path = self.layout.cpufreq_file(first, "cpuinfo_min_freq");
        let cur_min_path = self.layout.cpufreq_file(first, "scaling_min_freq");
        let cur_max_path = self.layout.cpufreq_file(first, "scaling_max_freq");
        let gov_path = self.layout.cpufreq_file(first, "scaling_governor");
        let govs_path = self.layout.cpufreq_file(first, "scaling_available_governors");
        let freqs_path = self.layout.cpufreq_file(first, "scaling_available_frequencies");

        let (min, cur_min, cur_max, governor, governors, freqs) = tokio::join!(
            read_u64(exec, &min_path),
            read_u64(exec, &cur_min_path),
            read_u64(exec, &cur_max_path),
            read_file(exec, &gov_path),
            read_file(exec, &govs_path),
            read_file(exec, &freqs_path),
        );

        if governor.is_err() {
            tracing::debug!(core = first, "scaling_governor unreadable, using default");
        }

        RawCluster {
            member_cores,
            min_freq: min.unwrap_or(0),
            max_freq,
            current_min_freq: cur_min.unwrap_or(0),
            current_max_freq: cur_max.unwrap_or(0),
            governor: governor.ok(),
            available_governors: governors
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            available_frequencies: freqs
                .map(|s| s.split_whitespace().filter_map(|w| w.parse().ok()).collect())
                .unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl TopologySource for ShellTopologySource {
    fn name(&self) -> &str {
        "shell"
    }

    async fn try_detect(&self) -> Option<Vec<Cluster>> {
        let cores = self.discover_cores().await;
        if cores.is_empty() {
            tracing::warn!("shell probe found no cores under {}", self.layout.cpu_base());
            return None;
        }
        tracing::debug!(?cores, "shell probe discovered cores");

        let mut groups = self.group_by_max_freq(&cores).await;
        let orphans = groups.remove(&0).unwrap_or_default();
        if !orphans.is_empty() {
            tracing::warn!(?orphans, "cores without cpuinfo_max_freq, matching by recovered ceiling");
        }

        let grouped = join_all(
            groups
                .into_iter()
                .map(|(max, members)| self.read_cluster(max, members)),
        );
        let single = join_all(orphans.into_iter().map(|core| self.read_cluster(0, vec![core])));
        let (grouped, single) = tokio::join!(grouped, single);

        let clusters = grouped.into_iter().map(|r| r.normalize(0)).collect();
        let orphans = single.into_iter().map(|r| r.normalize(0)).collect();
        Some(assemble(clusters, orphans))
    }
}

/// Folds orphan cores into the cluster sharing their ceiling, then orders
/// by max frequency and assigns indices.
fn assemble(mut clusters: Vec<Cluster>, orphans: Vec<Cluster>) -> Vec<Cluster> {
    for orphan in orphans {
        match clusters.iter_mut().find(|c| c.max_freq == orphan.max_freq) {
            Some(owner) => {
                owner.member_cores.extend(orphan.member_cores);
                owner.member_cores.sort_unstable();
            }
            None => clusters.push(orphan),
        }
    }
    clusters.sort_by_key(|c| (c.max_freq, c.first_core()));
    for (index, cluster) in clusters.iter_mut().enumerate() {
        cluster.index = index;
    }
    clusters
}
