// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # thermal-monitor
//!
//! Reads `/sys/class/thermal/` and answers one question: is it safe to
//! keep a cluster pinned at a high frequency?
//!
//! # Graceful Degradation
//! Zones that cannot be read are skipped. When no zone can be read at all
//! the temperature is reported as 0.0 and every cluster is considered
//! safe, so a device without thermal sysfs never blocks a lock.
//!
//! # Example
//! ```no_run
//! use cpu_topology::SysfsLayout;
//! use thermal_monitor::{SysfsThermalReader, ThermalMonitor, DEFAULT_MAX_TEMP};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let monitor = ThermalMonitor::new(Arc::new(SysfsThermalReader::new(SysfsLayout::system())));
//! if !monitor.is_cluster_safe(2, DEFAULT_MAX_TEMP).await {
//!     println!("prime cluster too hot");
//! }
//! # }
//! ```

mod error;
mod monitor;
mod zone;

pub use error::MonitorError;
pub use monitor::{aggregate_temperature, ThermalMonitor, DEFAULT_CPU_KEYWORDS, DEFAULT_MAX_TEMP};
pub use zone::{
    parse_temperature, ChainedThermalReader, ShellThermalReader, SysfsThermalReader, ThermalZone,
    ThermalZoneReader,
};
