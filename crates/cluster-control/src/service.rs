// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! [`ClusterService`]: the consumer-facing API.

use crate::cache::DetectingProvider;
use crate::lock::{JsonFileLockStore, LockPolicy, LockState, LockStore, MemoryLockStore};
use crate::{
    ClusterCache, ControlConfig, ControlError, EnforceReport, FrequencyController, LockOrchestrator,
    Verifier, VerifyReport,
};
use cpu_topology::{read_core_info, Cluster, Core, Mhz, SysfsLayout, TopologyDetector};
use freq_catalog::CatalogBuilder;
use priv_exec::Executor;
use std::sync::Arc;
use thermal_monitor::{
    ChainedThermalReader, ShellThermalReader, SysfsThermalReader, ThermalMonitor, ThermalZone,
    ThermalZoneReader,
};

/// Wires every component together from one [`ControlConfig`].
pub struct ClusterService {
    exec: Arc<dyn Executor>,
    layout: SysfsLayout,
    config: ControlConfig,
    cache: Arc<ClusterCache>,
    catalog: Arc<CatalogBuilder>,
    controller: Arc<FrequencyController>,
    verifier: Arc<Verifier>,
    thermal: Arc<ThermalMonitor>,
    orchestrator: LockOrchestrator,
}

impl ClusterService {
    /// Builds the service with the lock store named by the config (a JSON
    /// file if `lock_state_path` is set, memory otherwise).
    pub fn new(config: ControlConfig, exec: Arc<dyn Executor>) -> Self {
        let store: Arc<dyn LockStore> = match &config.lock_state_path {
            Some(path) => Arc::new(JsonFileLockStore::new(path)),
            None => Arc::new(MemoryLockStore::new()),
        };
        Self::with_store(config, exec, store)
    }

    pub fn with_store(config: ControlConfig, exec: Arc<dyn Executor>, store: Arc<dyn LockStore>) -> Self {
        let layout = config.layout();
        let catalog = Arc::new(
            CatalogBuilder::new(exec.clone(), layout.clone()).with_paths(config.catalog.clone()),
        );
        let detector = TopologyDetector::standard(
            exec.clone(),
            layout.clone(),
            config.max_cores,
            config.native_probe,
        );
        let provider = Arc::new(DetectingProvider::new(detector, catalog.clone()));
        let cache = Arc::new(ClusterCache::new(provider, config.cache_ttl()));

        let controller = Arc::new(FrequencyController::new(
            exec.clone(),
            layout.clone(),
            cache.clone(),
        ));
        let verifier = Arc::new(Verifier::new(cache.clone(), config.verify.clone()));

        let shell: Arc<dyn ThermalZoneReader> =
            Arc::new(ShellThermalReader::new(exec.clone(), layout.clone()));
        let reader: Arc<dyn ThermalZoneReader> = if config.native_probe {
            Arc::new(ChainedThermalReader::new(vec![
                Arc::new(SysfsThermalReader::new(layout.clone())),
                shell,
            ]))
        } else {
            shell
        };
        let thermal =
            Arc::new(ThermalMonitor::new(reader).with_keywords(config.thermal.keywords.clone()));

        let orchestrator = LockOrchestrator::new(
            cache.clone(),
            controller.clone(),
            verifier.clone(),
            thermal.clone(),
            store,
        )
        .with_whitelist(config.governor_whitelist.clone())
        .with_retry(config.retry.clone())
        .with_throttle_ratio(config.thermal.throttle_ratio);

        Self {
            exec,
            layout,
            config,
            cache,
            catalog,
            controller,
            verifier,
            thermal,
            orchestrator,
        }
    }

    /// Replaces the orchestrator's clock (retry accounting).
    pub fn with_clock(mut self, clock: crate::Clock) -> Self {
        self.orchestrator = self.orchestrator.with_clock(clock);
        self
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ClusterCache> {
        &self.cache
    }

    /// Detected clusters with enhanced frequency catalogs (cached).
    pub async fn detect_clusters(&self) -> Vec<Cluster> {
        self.cache.get().await
    }

    pub async fn set_cluster_frequency(&self, index: usize, min: Mhz, max: Mhz) -> Result<(), ControlError> {
        self.controller.set_frequency(index, min, max).await
    }

    /// Writes the governor, then confirms it by read-back.
    pub async fn set_cluster_governor(&self, index: usize, governor: &str) -> Result<(), ControlError> {
        self.controller.set_governor(index, governor).await?;
        self.verifier.verify_governor(index, governor).await.map(|_| ())
    }

    pub async fn lock_cluster_frequency(
        &self,
        index: usize,
        min: Mhz,
        max: Mhz,
        policy: LockPolicy,
    ) -> Result<VerifyReport, ControlError> {
        self.orchestrator.lock(index, min, max, policy).await
    }

    pub async fn unlock_cluster_frequency(&self, index: usize) -> Result<(), ControlError> {
        self.orchestrator.unlock(index).await
    }

    pub async fn enforce_locks(&self) -> Result<EnforceReport, ControlError> {
        self.orchestrator.enforce_locks().await
    }

    pub fn lock_state(&self) -> Result<Option<LockState>, ControlError> {
        self.orchestrator.lock_state()
    }

    /// Online state and current frequency of every core.
    pub async fn get_all_core_info(&self) -> Vec<Core> {
        let clusters = self.cache.get().await;
        read_core_info(self.exec.as_ref(), &self.layout, &clusters).await
    }

    pub async fn current_temperature(&self) -> f32 {
        self.thermal.current_temperature().await
    }

    pub async fn thermal_zones(&self) -> Vec<ThermalZone> {
        self.thermal.zones().await
    }

    /// Checks the cluster against `max_temp`, or the configured default.
    pub async fn is_cluster_safe(&self, index: usize, max_temp: Option<f32>) -> bool {
        let limit = max_temp.unwrap_or(self.config.thermal.max_temp);
        self.thermal.is_cluster_safe(index, limit).await
    }

    pub async fn verify_cluster_frequency(
        &self,
        index: usize,
        min: Mhz,
        max: Mhz,
    ) -> Result<VerifyReport, ControlError> {
        self.verifier.verify(index, min, max).await
    }

    /// Per-cluster, per-source dump of frequency detection.
    pub async fn debug_frequency_detection(&self) -> String {
        let clusters = self.cache.get().await;
        if clusters.is_empty() {
            return "no clusters detected\n".to_string();
        }
        self.catalog.debug_report(&clusters).await
    }
}
