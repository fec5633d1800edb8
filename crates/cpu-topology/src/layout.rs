// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Where the kernel interfaces live.
//!
//! Every path is computed from a root prefix (normally `/`) so the whole
//! stack can run against a fixture tree in a temporary directory.

use std::path::PathBuf;

/// Path builder for the cpufreq, thermal, and debugfs trees.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SysfsLayout {
    pub root: PathBuf,
}

impl Default for SysfsLayout {
    fn default() -> Self {
        Self::system()
    }
}

impl SysfsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The live system (`/`).
    pub fn system() -> Self {
        Self::new("/")
    }

    /// Rebases an absolute system path (e.g. `/sys/class/devfreq/x`) onto the root.
    pub fn resolve(&self, absolute: &str) -> String {
        let base = self.root.to_string_lossy();
        let base = base.trim_end_matches('/');
        format!("{base}/{}", absolute.trim_start_matches('/'))
    }

    pub fn cpu_base(&self) -> String {
        self.resolve("sys/devices/system/cpu")
    }

    /// `.../cpu/cpuN`, the device node whose existence marks a core.
    pub fn cpu_dir(&self, core: u32) -> String {
        format!("{}/cpu{core}", self.cpu_base())
    }

    pub fn online_file(&self, core: u32) -> String {
        format!("{}/online", self.cpu_dir(core))
    }

    /// `.../cpu/cpuN/cpufreq/<name>`.
    pub fn cpufreq_file(&self, core: u32, name: &str) -> String {
        format!("{}/cpufreq/{name}", self.cpu_dir(core))
    }

    /// `.../cpu/cpufreq`, parent of the `policyN` directories.
    pub fn cpufreq_root(&self) -> String {
        format!("{}/cpufreq", self.cpu_base())
    }

    pub fn policy_dir(&self, first_core: u32) -> String {
        format!("{}/policy{first_core}", self.cpufreq_root())
    }

    pub fn policy_file(&self, first_core: u32, name: &str) -> String {
        format!("{}/{name}", self.policy_dir(first_core))
    }

    /// `/sys/class/thermal`, holding `thermal_zoneN` and `cooling_deviceN`.
    pub fn thermal_class(&self) -> String {
        self.resolve("sys/class/thermal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_paths() {
        let l = SysfsLayout::system();
        assert_eq!(l.cpu_dir(3), "/sys/devices/system/cpu/cpu3");
        assert_eq!(
            l.cpufreq_file(0, "scaling_max_freq"),
            "/sys/devices/system/cpu/cpu0/cpufreq/scaling_max_freq"
        );
        assert_eq!(
            l.policy_file(4, "scaling_boost_frequencies"),
            "/sys/devices/system/cpu/cpufreq/policy4/scaling_boost_frequencies"
        );
        assert_eq!(l.thermal_class(), "/sys/class/thermal");
    }

    #[test]
    fn test_rebased_paths() {
        let l = SysfsLayout::new("/tmp/fixture/");
        assert_eq!(l.online_file(1), "/tmp/fixture/sys/devices/system/cpu/cpu1/online");
        assert_eq!(
            l.resolve("/sys/class/devfreq/cpu0/available_frequencies"),
            "/tmp/fixture/sys/class/devfreq/cpu0/available_frequencies"
        );
    }
}
