// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`TopologyDetector`]: an ordered fallback chain of sources.

use crate::{Cluster, NativeSysfsSource, ShellTopologySource, SysfsLayout, TopologyError, TopologySource};
use priv_exec::Executor;
use std::collections::HashMap;
use std::sync::Arc;

/// Tries each [`TopologySource`] in order and returns the first valid
/// partition.
///
/// The result is never partially populated: either every discovered core
/// belongs to exactly one cluster, or the list is empty.
pub struct TopologyDetector {
    sources: Vec<Box<dyn TopologySource>>,
}

impl TopologyDetector {
    pub fn new(sources: Vec<Box<dyn TopologySource>>) -> Self {
        Self { sources }
    }

    /// The standard chain: native policy enumeration (if enabled), then the
    /// shell probe.
    pub fn standard(
        exec: Arc<dyn Executor>,
        layout: SysfsLayout,
        max_cores: u32,
        native: bool,
    ) -> Self {
        let mut sources: Vec<Box<dyn TopologySource>> = Vec::new();
        if native {
            sources.push(Box::new(NativeSysfsSource::new(layout.clone())));
        }
        sources.push(Box::new(
            ShellTopologySource::new(exec, layout).with_max_cores(max_cores),
        ));
        Self::new(sources)
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Detects the cluster topology. An empty result means no source found
    /// any core.
    pub async fn detect(&self) -> Vec<Cluster> {
        for source in &self.sources {
            match source.try_detect().await {
                Some(clusters) if !clusters.is_empty() => match validate_partition(&clusters) {
                    Ok(()) => {
                        tracing::info!(
                            "{} clusters detected via {}",
                            clusters.len(),
                            source.name()
                        );
                        for c in &clusters {
                            tracing::debug!("{}", c.summary());
                        }
                        return clusters;
                    }
                    Err(e) => {
                        tracing::warn!("{} produced an invalid topology: {e}", source.name());
                    }
                },
                _ => tracing::debug!("{} yielded no clusters", source.name()),
            }
        }
        tracing::warn!("topology detection failed: no source found any core");
        Vec::new()
    }
}

/// Checks that clusters are indexed `0..n`, ascending by max frequency,
/// non-empty, and pairwise disjoint.
pub fn validate_partition(clusters: &[Cluster]) -> Result<(), TopologyError> {
    let mut owner: HashMap<u32, usize> = HashMap::new();
    for (position, cluster) in clusters.iter().enumerate() {
        if cluster.index != position {
            return Err(TopologyError::IndexMismatch {
                position,
                index: cluster.index,
            });
        }
        if cluster.member_cores.is_empty() {
            return Err(TopologyError::EmptyCluster {
                index: cluster.index,
            });
        }
        if position > 0 && clusters[position - 1].max_freq > cluster.max_freq {
            return Err(TopologyError::Unordered {
                index: cluster.index,
            });
        }
        for &core in &cluster.member_cores {
            if let Some(first) = owner.insert(core, cluster.index) {
                return Err(TopologyError::DuplicateCore {
                    core,
                    first,
                    second: cluster.index,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawCluster;

    struct Fixed(&'static str, Option<Vec<Cluster>>);

    #[async_trait::async_trait]
    impl TopologySource for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        async fn try_detect(&self) -> Option<Vec<Cluster>> {
            self.1.clone()
        }
    }

    fn cluster(index: usize, cores: &[u32], max_khz: u64) -> Cluster {
        RawCluster {
            member_cores: cores.to_vec(),
            min_freq: 300_000,
            max_freq: max_khz,
            ..Default::default()
        }
        .normalize(index)
    }

    #[tokio::test]
    async fn test_first_valid_source_wins() {
        let detector = TopologyDetector::new(vec![
            Box::new(Fixed("a", Some(vec![cluster(0, &[0, 1], 1_804_800)]))),
            Box::new(Fixed("b", Some(vec![cluster(0, &[0], 1_000_000)]))),
        ]);
        let clusters = detector.detect().await;
        assert_eq!(clusters[0].member_cores, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_falls_back_on_none_and_empty() {
        let detector = TopologyDetector::new(vec![
            Box::new(Fixed("none", None)),
            Box::new(Fixed("empty", Some(vec![]))),
            Box::new(Fixed("ok", Some(vec![cluster(0, &[0], 1_804_800)]))),
        ]);
        assert_eq!(detector.detect().await.len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_on_overlap() {
        let overlapping = vec![
            cluster(0, &[0, 1], 1_804_800),
            cluster(1, &[1, 2], 2_419_200),
        ];
        let detector = TopologyDetector::new(vec![
            Box::new(Fixed("bad", Some(overlapping))),
            Box::new(Fixed("good", Some(vec![cluster(0, &[0, 1, 2], 1_804_800)]))),
        ]);
        assert_eq!(detector.detect().await[0].member_cores, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_total_failure_is_empty() {
        let detector = TopologyDetector::new(vec![Box::new(Fixed("none", None))]);
        assert!(detector.detect().await.is_empty());
    }

    #[test]
    fn test_validate_partition_errors() {
        let dup = vec![cluster(0, &[0], 1_000_000), cluster(1, &[0], 2_000_000)];
        assert_eq!(
            validate_partition(&dup),
            Err(TopologyError::DuplicateCore {
                core: 0,
                first: 0,
                second: 1
            })
        );

        let unordered = vec![cluster(0, &[0], 2_000_000), cluster(1, &[1], 1_000_000)];
        assert_eq!(
            validate_partition(&unordered),
            Err(TopologyError::Unordered { index: 1 })
        );

        let misindexed = vec![cluster(1, &[0], 1_000_000)];
        assert!(matches!(
            validate_partition(&misindexed),
            Err(TopologyError::IndexMismatch { .. })
        ));

        let mut empty = cluster(0, &[0], 1_000_000);
        empty.member_cores.clear();
        assert_eq!(
            validate_partition(&[empty]),
            Err(TopologyError::EmptyCluster { index: 0 })
        );
    }

    #[test]
    fn test_standard_chain_names() {
        let exec: Arc<dyn Executor> = Arc::new(priv_exec::FakeDevice::new());
        let d = TopologyDetector::standard(exec.clone(), SysfsLayout::system(), 16, true);
        assert_eq!(d.source_names(), vec!["native-sysfs", "shell"]);
        let d = TopologyDetector::standard(exec, SysfsLayout::system(), 16, false);
        assert_eq!(d.source_names(), vec!["shell"]);
    }
}
