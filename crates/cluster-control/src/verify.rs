// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Read-back confirmation of cluster writes.
//!
//! cpufreq applies requests asynchronously and sometimes rounds them to the
//! nearest operating point, so a successful write proves nothing. The
//! verifier polls the cluster, forcing a fresh detection each time, until
//! the observed bounds are within tolerance of the request.

use crate::config::VerifyConfig;
use crate::{ClusterCache, ControlError};
use cpu_topology::{Cluster, Mhz};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Polls made, including the successful one.
    pub attempts: u32,
    pub observed_min: Mhz,
    pub observed_max: Mhz,
    pub elapsed: Duration,
}

/// Polls the cluster cache until hardware reflects a request.
pub struct Verifier {
    cache: Arc<ClusterCache>,
    config: VerifyConfig,
}

impl Verifier {
    pub fn new(cache: Arc<ClusterCache>, config: VerifyConfig) -> Self {
        Self { cache, config }
    }

    pub fn tolerance(&self) -> Mhz {
        self.config.tolerance_mhz
    }

    async fn poll(&self, index: usize) -> Option<Cluster> {
        self.cache
            .refresh()
            .await
            .into_iter()
            .find(|c| c.index == index)
    }

    /// Waits until the cluster's active bounds match `min`/`max` within
    /// tolerance.
    ///
    /// The first poll is immediate. Gives up after `max_attempts` polls or
    /// once the next poll would fall past `timeout`.
    pub async fn verify(&self, index: usize, min: Mhz, max: Mhz) -> Result<VerifyReport, ControlError> {
        let tolerance = self.config.tolerance_mhz;
        let start = Instant::now();
        let mut attempts = 0;
        let mut last = (0, 0);

        loop {
            attempts += 1;
            if let Some(c) = self.poll(index).await {
                last = (c.current_min_freq, c.current_max_freq);
                tracing::debug!(
                    cluster = index,
                    attempt = attempts,
                    "observed {}-{} MHz, want {min}-{max} MHz",
                    last.0,
                    last.1
                );
                if c.current_min_freq.abs_diff(min) <= tolerance
                    && c.current_max_freq.abs_diff(max) <= tolerance
                {
                    tracing::info!(cluster = index, attempts, "frequency verified");
                    return Ok(VerifyReport {
                        attempts,
                        observed_min: last.0,
                        observed_max: last.1,
                        elapsed: start.elapsed(),
                    });
                }
            }
            if !self.has_budget(attempts, self.config.max_attempts, start, self.config.poll_interval()) {
                break;
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }

        tracing::warn!(cluster = index, attempts, "frequency verification failed");
        Err(ControlError::VerificationFailed {
            cluster: index,
            expected_min: min,
            expected_max: max,
            actual_min: last.0,
            actual_max: last.1,
            attempts,
        })
    }

    /// Waits until the cluster reports `governor`.
    pub async fn verify_governor(&self, index: usize, governor: &str) -> Result<u32, ControlError> {
        let start = Instant::now();
        let mut attempts = 0;
        let mut actual = String::new();

        loop {
            attempts += 1;
            if let Some(c) = self.poll(index).await {
                if c.governor == governor {
                    tracing::info!(cluster = index, governor, attempts, "governor verified");
                    return Ok(attempts);
                }
                actual = c.governor;
            }
            let interval = self.config.governor_interval();
            if !self.has_budget(attempts, self.config.governor_attempts, start, interval) {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        tracing::warn!(cluster = index, governor, %actual, "governor not applied");
        Err(ControlError::GovernorNotApplied {
            cluster: index,
            expected: governor.to_string(),
            actual,
            attempts,
        })
    }

    fn has_budget(&self, attempts: u32, max_attempts: u32, start: Instant, interval: Duration) -> bool {
        attempts < max_attempts && start.elapsed() + interval <= self.config.timeout()
    }
}
