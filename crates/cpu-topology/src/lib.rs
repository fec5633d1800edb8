// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cpu-topology
//!
//! Discovers the performance domains ("clusters") of a heterogeneous CPU:
//! groups of cores that share a frequency scaling policy.
//!
//! Detection runs an ordered chain of [`TopologySource`]s:
//! 1. [`NativeSysfsSource`]: enumerates `cpufreq/policyN` in-process.
//! 2. [`ShellTopologySource`]: probes per-core cpufreq files through a
//!    [`priv_exec::Executor`] and groups cores by `cpuinfo_max_freq`.
//!
//! Whatever source answers, the result is normalised the same way: MHz
//! units, ascending cluster order, and bounds clamped into
//! `min ≤ cur_min ≤ cur_max ≤ max`.
//!
//! # Example
//! ```no_run
//! use cpu_topology::{SysfsLayout, TopologyDetector, DEFAULT_MAX_CORES};
//! use priv_exec::ShellExecutor;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let detector = TopologyDetector::standard(
//!     Arc::new(ShellExecutor::su()),
//!     SysfsLayout::system(),
//!     DEFAULT_MAX_CORES,
//!     true,
//! );
//! for cluster in detector.detect().await {
//!     println!("{}", cluster.summary());
//! }
//! # }
//! ```

mod cores;
mod detector;
mod error;
mod layout;
mod model;
mod native;
mod shell;
mod source;
pub mod units;

pub use cores::read_core_info;
pub use detector::{validate_partition, TopologyDetector};
pub use error::TopologyError;
pub use layout::SysfsLayout;
pub use model::{parse_cpu_list, Cluster, Core, RawCluster, DEFAULT_GOVERNOR, DEFAULT_GOVERNORS};
pub use native::NativeSysfsSource;
pub use shell::{ShellTopologySource, DEFAULT_MAX_CORES};
pub use source::TopologySource;
pub use units::Mhz;
