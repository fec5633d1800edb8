// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Time-bounded memoisation of the detected topology.
//!
//! Every mutation of hardware state must call [`ClusterCache::invalidate`]
//! before returning, so the next reader observes the device rather than a
//! stale snapshot. A detection that was already running when
//! [`ClusterCache::invalidate`] was called is returned to its caller but
//! never stored. Two readers arriving after expiry may both run detection;
//! the later result wins.

use cpu_topology::{Cluster, TopologyDetector};
use freq_catalog::CatalogBuilder;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live of a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_millis(30_000);

/// Produces a fresh topology on a cache miss.
#[async_trait::async_trait]
pub trait ClusterProvider: Send + Sync {
    async fn load(&self) -> Vec<Cluster>;
}

/// Detects the topology, then enhances each cluster's frequency catalog.
pub struct DetectingProvider {
    detector: TopologyDetector,
    catalog: Arc<CatalogBuilder>,
}

impl DetectingProvider {
    pub fn new(detector: TopologyDetector, catalog: Arc<CatalogBuilder>) -> Self {
        Self { detector, catalog }
    }
}

#[async_trait::async_trait]
impl ClusterProvider for DetectingProvider {
    async fn load(&self) -> Vec<Cluster> {
        let clusters = self.detector.detect().await;
        let catalog = self.catalog.as_ref();
        join_all(clusters.into_iter().map(|mut cluster| async move {
            cluster.available_frequencies =
                catalog.enhance(&cluster.available_frequencies, &cluster).await;
            cluster
        }))
        .await
    }
}

struct CacheEntry {
    clusters: Vec<Cluster>,
    captured_at: Instant,
}

/// Read-through topology cache with a fixed TTL.
pub struct ClusterCache {
    provider: Arc<dyn ClusterProvider>,
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
    detections: AtomicU64,
    /// Bumped by every invalidation.
    generation: AtomicU64,
}

impl ClusterCache {
    pub fn new(provider: Arc<dyn ClusterProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entry: Mutex::new(None),
            detections: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached topology, detecting it if absent or expired.
    ///
    /// An empty detection result is returned but not cached.
    pub async fn get(&self) -> Vec<Cluster> {
        if let Some(clusters) = self.fresh() {
            return clusters;
        }

        self.detections.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::SeqCst);
        let clusters = self.provider.load().await;
        if clusters.is_empty() {
            tracing::warn!("cluster detection returned no clusters");
            return clusters;
        }

        let mut slot = self.slot();
        if self.generation.load(Ordering::SeqCst) == generation {
            *slot = Some(CacheEntry {
                clusters: clusters.clone(),
                captured_at: Instant::now(),
            });
        } else {
            tracing::debug!("cache invalidated during detection, result not stored");
        }
        clusters
    }

    /// Looks up one cluster by index.
    pub async fn cluster(&self, index: usize) -> Option<Cluster> {
        self.get().await.into_iter().find(|c| c.index == index)
    }

    /// Evicts the cached topology unconditionally.
    pub fn invalidate(&self) {
        let mut slot = self.slot();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if slot.take().is_some() {
            tracing::debug!("cluster cache invalidated");
        }
    }

    /// Invalidates, then detects again.
    pub async fn refresh(&self) -> Vec<Cluster> {
        self.invalidate();
        self.get().await
    }

    /// Returns `true` if a non-expired entry is held.
    pub fn is_fresh(&self) -> bool {
        self.fresh().is_some()
    }

    /// Number of times the provider has been invoked.
    pub fn detection_count(&self) -> u64 {
        self.detections.load(Ordering::Relaxed)
    }

    fn fresh(&self) -> Option<Vec<Cluster>> {
        self.slot()
            .as_ref()
            .filter(|e| e.captured_at.elapsed() < self.ttl)
            .map(|e| e.clusters.clone())
    }

    fn slot(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.entry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpu_topology::RawCluster;
    use std::sync::atomic::AtomicUsize;

    struct Counting {
        calls: AtomicUsize,
        empty: bool,
    }

    #[async_trait::async_trait]
    impl ClusterProvider for Counting {
        async fn load(&self) -> Vec<Cluster> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.empty {
                return Vec::new();
            }
            vec![RawCluster {
                member_cores: vec![0],
                max_freq: 1_000_000 + n as u64 * 1_000,
                ..Default::default()
            }
            .normalize(0)]
        }
    }

    fn cache(empty: bool) -> (Arc<Counting>, ClusterCache) {
        let provider = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            empty,
        });
        let cache = ClusterCache::new(provider.clone(), DEFAULT_TTL);
        (provider, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl() {
        let (provider, cache) = cache(false);
        let a = cache.get().await;
        tokio::time::advance(Duration::from_millis(29_999)).await;
        let b = cache.get().await;
        assert_eq!(a, b);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.detection_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_ttl() {
        let (provider, cache) = cache(false);
        cache.get().await;
        tokio::time::advance(DEFAULT_TTL).await;
        assert!(!cache.is_fresh());
        let again = cache.get().await;
        assert_eq!(again[0].max_freq, 1001);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_detection() {
        let (provider, cache) = cache(false);
        cache.get().await;
        cache.invalidate();
        assert!(!cache.is_fresh());
        cache.get().await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_and_lookup() {
        let (provider, cache) = cache(false);
        cache.get().await;
        let refreshed = cache.refresh().await;
        assert_eq!(refreshed[0].max_freq, 1001);
        assert!(cache.cluster(0).await.is_some());
        assert!(cache.cluster(1).await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_not_cached() {
        let (provider, cache) = cache(true);
        assert!(cache.get().await.is_empty());
        assert!(cache.get().await.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    /// Takes 100 ms per detection; the ceiling climbs 1 MHz per call.
    #[derive(Default)]
    struct Slow {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ClusterProvider for Slow {
        async fn load(&self) -> Vec<Cluster> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            vec![RawCluster {
                member_cores: vec![0],
                max_freq: 1_000_000 + n as u64 * 1_000,
                ..Default::default()
            }
            .normalize(0)]
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_detection_discards_result() {
        let provider = Arc::new(Slow::default());
        let cache = Arc::new(ClusterCache::new(provider.clone(), DEFAULT_TTL));

        let loading = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.invalidate();

        // The caller still gets its snapshot, but it is not kept.
        let snapshot = loading.await.unwrap();
        assert_eq!(snapshot[0].max_freq, 1000);
        assert!(!cache.is_fresh());

        let fresh = cache.get().await;
        assert_eq!(fresh[0].max_freq, 1001);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_fresh());
    }
}
