// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Control configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! executor = "su"
//! command_timeout_ms = 5000
//! sysfs_root = "/"
//! native_probe = true
//! max_cores = 16
//! cache_ttl_ms = 30000
//! governor_whitelist = ["userspace", "performance", "schedutil", "interactive", "ondemand"]
//! lock_state_path = "/data/local/tmp/clusterctl/lock.json"
//!
//! [verify]
//! poll_interval_ms = 300
//! timeout_ms = 3000
//! max_attempts = 10
//! tolerance_mhz = 50
//!
//! [thermal]
//! max_temp = 75.0
//! keywords = ["cpu", "tsens", "thermal", "soc"]
//!
//! [retry]
//! window_ms = 3600000
//! max_per_window = 5
//!
//! [catalog]
//! opp_templates = ["/sys/kernel/debug/opp/cpu{core}/opp_summary"]
//! ```
//!
//! Every section and key is optional; missing keys take the defaults shown.

use crate::ControlError;
use cpu_topology::{Mhz, SysfsLayout, DEFAULT_MAX_CORES};
use freq_catalog::CatalogPaths;
use priv_exec::{Executor, ShellExecutor, ShellKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thermal_monitor::{DEFAULT_CPU_KEYWORDS, DEFAULT_MAX_TEMP};

/// Governors under which fixed `scaling_{min,max}_freq` bounds are honoured.
pub const GOVERNOR_WHITELIST: [&str; 5] =
    ["userspace", "performance", "schedutil", "interactive", "ondemand"];

/// Read-back polling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    /// Accepted distance between requested and observed bounds.
    pub tolerance_mhz: Mhz,
    pub governor_attempts: u32,
    pub governor_interval_ms: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 300,
            timeout_ms: 3000,
            max_attempts: 10,
            tolerance_mhz: 50,
            governor_attempts: 5,
            governor_interval_ms: 100,
        }
    }
}

impl VerifyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn governor_interval(&self) -> Duration {
        Duration::from_millis(self.governor_interval_ms)
    }
}

/// Thermal policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Default safety threshold (°C).
    pub max_temp: f32,
    /// Zone-name fragments identifying CPU sensors.
    pub keywords: Vec<String>,
    /// Fraction of the locked ceiling used while a thermal-adaptive lock
    /// is over temperature.
    pub throttle_ratio: f32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            max_temp: DEFAULT_MAX_TEMP,
            keywords: DEFAULT_CPU_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            throttle_ratio: 0.8,
        }
    }
}

/// Re-apply budget for drifted locks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub window_ms: u64,
    pub max_per_window: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            window_ms: crate::lock::RETRY_WINDOW_MS,
            max_per_window: 5,
        }
    }
}

/// Configuration for the control stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Shell used for privileged commands: `"su"` or `"sh"`.
    pub executor: ShellKind,
    pub command_timeout_ms: u64,
    /// Prefix under which `/sys` is found.
    pub sysfs_root: PathBuf,
    /// Read cpufreq policies and thermal zones in-process when possible.
    pub native_probe: bool,
    /// Highest number of cores probed by the shell fallback.
    pub max_cores: u32,
    pub cache_ttl_ms: u64,
    pub governor_whitelist: Vec<String>,
    /// Where the lock state is persisted; in memory only when unset.
    pub lock_state_path: Option<PathBuf>,
    pub verify: VerifyConfig,
    pub thermal: ThermalConfig,
    pub retry: RetryConfig,
    pub catalog: CatalogPaths,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            executor: ShellKind::Su,
            command_timeout_ms: ShellExecutor::DEFAULT_TIMEOUT.as_millis() as u64,
            sysfs_root: PathBuf::from("/"),
            native_probe: true,
            max_cores: DEFAULT_MAX_CORES,
            cache_ttl_ms: 30_000,
            governor_whitelist: GOVERNOR_WHITELIST.iter().map(|g| g.to_string()).collect(),
            lock_state_path: None,
            verify: VerifyConfig::default(),
            thermal: ThermalConfig::default(),
            retry: RetryConfig::default(),
            catalog: CatalogPaths::default(),
        }
    }
}

impl ControlConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ControlError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ControlError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ControlError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| ControlError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ControlError> {
        toml::to_string_pretty(self)
            .map_err(|e| ControlError::Config(format!("TOML serialise error: {e}")))
    }

    /// Rejects values the control loop cannot run with.
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.verify.max_attempts == 0 || self.verify.governor_attempts == 0 {
            return Err(ControlError::Config(
                "verification needs at least one attempt".into(),
            ));
        }
        if self.verify.poll_interval_ms == 0 {
            return Err(ControlError::Config("poll_interval_ms must be positive".into()));
        }
        if !(self.thermal.throttle_ratio > 0.0 && self.thermal.throttle_ratio <= 1.0) {
            return Err(ControlError::Config(format!(
                "throttle_ratio {} must be in (0, 1]",
                self.thermal.throttle_ratio
            )));
        }
        if self.governor_whitelist.is_empty() {
            return Err(ControlError::Config("governor_whitelist is empty".into()));
        }
        Ok(())
    }

    pub fn layout(&self) -> SysfsLayout {
        SysfsLayout::new(&self.sysfs_root)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Creates the shell executor specified by this config.
    pub fn create_executor(&self) -> Arc<dyn Executor> {
        Arc::new(ShellExecutor::new(
            self.executor,
            Duration::from_millis(self.command_timeout_ms),
        ))
    }
}
