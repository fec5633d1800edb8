// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # freq-catalog
//!
//! Reconciles the frequency tables a device exposes into one catalog per
//! cluster.
//!
//! Kernels and vendors publish the selectable frequencies of a CPU in up to
//! six places, in three different units, and rarely all of them agree.
//! [`CatalogBuilder::enhance`] reads every source concurrently, keeps
//! whatever each one yields, and merges the union with the list detected
//! with the topology:
//!
//! | Source | Location | Unit |
//! |---|---|---|
//! | Hardware limits | `cpuN/cpufreq/cpuinfo_{min,max}_freq` | kHz |
//! | OPP tables | debugfs `opp_summary` | Hz |
//! | Policy files | `cpufreq/policyN/*_frequencies` | kHz |
//! | Devfreq | vendor `available_frequencies` | any |
//! | Time in state | `stats/time_in_state` | kHz |
//! | Cooling devices | `thermal/cooling_deviceN` | any |
//!
//! A source that fails contributes nothing; the failure is logged at
//! `debug` and otherwise ignored.

mod builder;
mod error;
pub mod parse;
mod paths;
mod sources;

pub use builder::{CatalogBuilder, SourceContribution};
pub use error::CatalogError;
pub use paths::{expand, CatalogPaths};
pub use sources::FrequencySource;
