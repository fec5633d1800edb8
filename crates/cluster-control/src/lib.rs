// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cluster-control
//!
//! Applies frequency and governor policy to CPU clusters and confirms that
//! the hardware followed.
//!
//! The pieces, leaves first:
//! - [`ClusterCache`]: TTL memoisation of topology + frequency catalog.
//! - [`FrequencyController`]: per-core cpufreq writes; invalidates the
//!   cache after every mutation.
//! - [`Verifier`]: bounded read-back polling.
//! - [`LockOrchestrator`]: governor check, write, verify, persist; plus
//!   drift enforcement under an hourly retry budget.
//! - [`ClusterService`]: wires everything from a [`ControlConfig`].
//!
//! # Example
//! ```no_run
//! use cluster_control::{ClusterService, ControlConfig, LockPolicy};
//!
//! # async fn example() -> Result<(), cluster_control::ControlError> {
//! let config = ControlConfig::default();
//! let exec = config.create_executor();
//! let service = ClusterService::new(config, exec);
//!
//! let clusters = service.detect_clusters().await;
//! let prime = clusters.last().expect("no clusters");
//! let report = service
//!     .lock_cluster_frequency(prime.index, prime.max_freq, prime.max_freq, LockPolicy::Manual)
//!     .await?;
//! println!("locked after {} polls", report.attempts);
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod config;
mod controller;
mod error;
pub mod lock;
mod orchestrator;
mod service;
mod verify;

pub use cache::{ClusterCache, ClusterProvider, DetectingProvider, DEFAULT_TTL};
pub use config::{ControlConfig, RetryConfig, ThermalConfig, VerifyConfig, GOVERNOR_WHITELIST};
pub use controller::FrequencyController;
pub use error::ControlError;
pub use lock::{
    ClusterTarget, JsonFileLockStore, LockPolicy, LockState, LockStore, MemoryLockStore, RetryBudget,
};
pub use orchestrator::{throttled_target, Clock, EnforceAction, EnforceReport, LockOrchestrator};
pub use service::ClusterService;
pub use verify::{VerifyReport, Verifier};
