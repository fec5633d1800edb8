// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lock/unlock orchestration.
//!
//! # Lock sequence
//! ```text
//! governor check ─▶ write bounds ─▶ invalidate cache ─▶ verify ─▶ persist target
//!        │                │                                │
//!        └─ IncompatibleGovernor (no writes)   failure ─▶ record retry, return error
//! ```
//!
//! A failed lock is not rolled back: the bounds that were written stay
//! written, and the caller decides whether to retry or unlock.
//!
//! # Enforcement
//! [`LockOrchestrator::enforce_locks`] re-reads every locked cluster and
//! re-applies targets that drifted (another process, a thermal daemon, a
//! vendor boost framework). Re-application is limited by an hourly
//! [`RetryBudget`]. Under a [`LockPolicy::ThermalAdaptive`] policy the
//! ceiling is lowered while the CPU is at or above the policy's limit.

use crate::config::RetryConfig;
use crate::lock::{ClusterTarget, LockPolicy, LockState, LockStore};
use crate::{ClusterCache, ControlError, FrequencyController, Verifier, VerifyReport};
use cpu_topology::Mhz;
use std::sync::Arc;
use thermal_monitor::ThermalMonitor;

/// Source of wall-clock milliseconds for retry accounting.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

fn system_now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// What enforcement did for one cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum EnforceAction {
    /// Observed bounds already match the target.
    InSync,
    /// The locked target was written and verified again.
    Reapplied { min: Mhz, max: Mhz },
    /// A thermally lowered target was written and verified.
    Throttled { min: Mhz, max: Mhz },
    /// Drift detected but the hourly budget is spent.
    BudgetExhausted,
    /// Re-application failed.
    Failed(String),
    /// The cluster is absent from the current topology.
    ClusterMissing,
}

/// Summary of one enforcement pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnforceReport {
    pub temperature: Option<f32>,
    /// `true` if a thermal-adaptive policy lowered the ceilings.
    pub throttling: bool,
    pub actions: Vec<(usize, EnforceAction)>,
}

/// Lowers a target's ceiling to the highest catalog frequency at or below
/// `ratio` of the locked maximum, never below the locked minimum.
pub fn throttled_target(target: ClusterTarget, catalog: &[Mhz], ratio: f32) -> ClusterTarget {
    let limit = (target.max as f32 * ratio) as Mhz;
    let ceiling = catalog
        .iter()
        .copied()
        .filter(|&f| f <= limit)
        .max()
        .unwrap_or(limit);
    ClusterTarget::new(target.min, ceiling.max(target.min))
}

/// Coordinates controller, verifier, thermal monitor and lock store.
pub struct LockOrchestrator {
    cache: Arc<ClusterCache>,
    controller: Arc<FrequencyController>,
    verifier: Arc<Verifier>,
    thermal: Arc<ThermalMonitor>,
    store: Arc<dyn LockStore>,
    whitelist: Vec<String>,
    retry: RetryConfig,
    throttle_ratio: f32,
    clock: Clock,
}

impl LockOrchestrator {
    pub fn new(
        cache: Arc<ClusterCache>,
        controller: Arc<FrequencyController>,
        verifier: Arc<Verifier>,
        thermal: Arc<ThermalMonitor>,
        store: Arc<dyn LockStore>,
    ) -> Self {
        Self {
            cache,
            controller,
            verifier,
            thermal,
            store,
            whitelist: crate::GOVERNOR_WHITELIST.iter().map(|g| g.to_string()).collect(),
            retry: RetryConfig::default(),
            throttle_ratio: 0.8,
            clock: Arc::new(system_now_ms),
        }
    }

    pub fn with_whitelist(mut self, whitelist: Vec<String>) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_throttle_ratio(mut self, ratio: f32) -> Self {
        self.throttle_ratio = ratio;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn lock_state(&self) -> Result<Option<LockState>, ControlError> {
        self.store.get()
    }

    /// Pins a cluster to `[min, max]` and remembers the target.
    pub async fn lock(
        &self,
        index: usize,
        min: Mhz,
        max: Mhz,
        policy: LockPolicy,
    ) -> Result<VerifyReport, ControlError> {
        let cluster = self
            .cache
            .cluster(index)
            .await
            .ok_or(ControlError::ClusterNotFound(index))?;

        let compatible = cluster
            .available_governors
            .iter()
            .any(|g| self.whitelist.contains(g));
        if !compatible {
            tracing::warn!(cluster = index, available = ?cluster.available_governors, "no lock-compatible governor");
            return Err(ControlError::IncompatibleGovernor {
                cluster: index,
                available: cluster.available_governors,
            });
        }

        let applied = match self.controller.set_frequency(index, min, max).await {
            Ok(()) => self.verifier.verify(index, min, max).await,
            Err(e) => Err(e),
        };

        let report = match applied {
            Ok(report) => report,
            Err(e) => {
                self.record_failed_attempt();
                return Err(e);
            }
        };

        let mut state = self.store.get()?.unwrap_or_default();
        state.is_locked = true;
        state.targets.insert(index, ClusterTarget::new(min, max));
        state.policy = policy;
        state.last_temperature = Some(self.thermal.current_temperature().await);
        self.store.set(&state)?;
        tracing::info!(cluster = index, min, max, ?policy, "cluster locked");
        Ok(report)
    }

    /// Restores a cluster's hardware bounds and forgets its target.
    pub async fn unlock(&self, index: usize) -> Result<(), ControlError> {
        let cluster = self
            .cache
            .cluster(index)
            .await
            .ok_or(ControlError::ClusterNotFound(index))?;
        self.controller
            .set_frequency(index, cluster.min_freq, cluster.max_freq)
            .await?;

        if let Some(mut state) = self.store.get()? {
            state.targets.remove(&index);
            if state.targets.is_empty() {
                self.store.clear()?;
            } else {
                self.store.set(&state)?;
            }
        }
        tracing::info!(cluster = index, "cluster unlocked");
        Ok(())
    }

    /// Re-applies drifted locks within the retry budget.
    pub async fn enforce_locks(&self) -> Result<EnforceReport, ControlError> {
        let Some(mut state) = self.store.get()? else {
            return Ok(EnforceReport::default());
        };
        if !state.is_locked || state.targets.is_empty() {
            return Ok(EnforceReport::default());
        }

        let temperature = self.thermal.current_temperature().await;
        state.last_temperature = Some(temperature);
        let throttling = matches!(
            state.policy,
            LockPolicy::ThermalAdaptive { max_temp } if temperature >= max_temp
        );
        if throttling {
            tracing::warn!(temperature, "thermal-adaptive lock over limit, lowering ceilings");
        }

        let clusters = self.cache.refresh().await;
        let tolerance = self.verifier.tolerance();
        let mut actions = Vec::with_capacity(state.targets.len());

        for (index, target) in state.targets.clone() {
            let Some(cluster) = clusters.iter().find(|c| c.index == index) else {
                actions.push((index, EnforceAction::ClusterMissing));
                continue;
            };
            let desired = if throttling {
                throttled_target(target, &cluster.available_frequencies, self.throttle_ratio)
            } else {
                target
            };
            if desired.matches(cluster.current_min_freq, cluster.current_max_freq, tolerance) {
                actions.push((index, EnforceAction::InSync));
                continue;
            }

            let now = (self.clock)();
            if state
                .retry
                .is_exhausted(now, self.retry.window_ms, self.retry.max_per_window)
            {
                tracing::warn!(cluster = index, "lock drifted but retry budget is exhausted");
                actions.push((index, EnforceAction::BudgetExhausted));
                continue;
            }
            state.retry = state.retry.record_attempt_within(now, self.retry.window_ms);

            let applied = match self.controller.set_frequency(index, desired.min, desired.max).await {
                Ok(()) => self.verifier.verify(index, desired.min, desired.max).await.map(|_| ()),
                Err(e) => Err(e),
            };
            let action = match applied {
                Ok(()) if desired != target => EnforceAction::Throttled {
                    min: desired.min,
                    max: desired.max,
                },
                Ok(()) => EnforceAction::Reapplied {
                    min: desired.min,
                    max: desired.max,
                },
                Err(e) => EnforceAction::Failed(e.to_string()),
            };
            tracing::info!(cluster = index, ?action, "lock enforced");
            actions.push((index, action));
        }

        self.store.set(&state)?;
        Ok(EnforceReport {
            temperature: Some(temperature),
            throttling,
            actions,
        })
    }

    fn record_failed_attempt(&self) {
        let now = (self.clock)();
        let result = self.store.get().and_then(|state| {
            let mut state = state.unwrap_or_default();
            state.retry = state.retry.record_attempt_within(now, self.retry.window_ms);
            self.store.set(&state)
        });
        if let Err(e) = result {
            tracing::warn!("cannot record failed lock attempt: {e}");
        }
    }
}
