// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cluster and core data model.

use crate::units::{khz_to_mhz, Mhz, KHZ_DETECTION_THRESHOLD};

/// Governor assumed when `scaling_governor` cannot be read.
pub const DEFAULT_GOVERNOR: &str = "schedutil";

/// Governors assumed when `scaling_available_governors` cannot be read.
pub const DEFAULT_GOVERNORS: [&str; 3] = ["performance", "powersave", "schedutil"];

/// A performance domain: cores the hardware scales identically.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cluster {
    /// Position in ascending max-frequency order.
    pub index: usize,
    /// Member core ids, ascending. Never empty.
    pub member_cores: Vec<u32>,
    /// Hardware lower bound (`cpuinfo_min_freq`).
    pub min_freq: Mhz,
    /// Hardware upper bound (`cpuinfo_max_freq`).
    pub max_freq: Mhz,
    /// Active lower scaling bound.
    pub current_min_freq: Mhz,
    /// Active upper scaling bound.
    pub current_max_freq: Mhz,
    /// Active scaling governor.
    pub governor: String,
    /// Governors the hardware reports as selectable.
    pub available_governors: Vec<String>,
    /// Sorted, deduplicated frequencies the cluster can run at.
    pub available_frequencies: Vec<Mhz>,
    /// `available_frequencies` as detected, before any catalog merge.
    #[serde(default)]
    pub detected_frequencies: Vec<Mhz>,
}

impl Cluster {
    /// The core whose cpufreq files stand in for the whole cluster.
    pub fn first_core(&self) -> u32 {
        self.member_cores.first().copied().unwrap_or_default()
    }

    pub fn contains_core(&self, core: u32) -> bool {
        self.member_cores.contains(&core)
    }

    pub fn supports_governor(&self, name: &str) -> bool {
        self.available_governors.iter().any(|g| g == name)
    }

    /// Clamps the bounds into `min ≤ cur_min ≤ cur_max ≤ max`.
    ///
    /// A zero current bound means "unread" and takes the hardware bound.
    pub fn normalize_bounds(&mut self) {
        if self.min_freq > self.max_freq {
            std::mem::swap(&mut self.min_freq, &mut self.max_freq);
        }
        if self.current_max_freq == 0 {
            self.current_max_freq = self.max_freq;
        }
        if self.current_min_freq == 0 {
            self.current_min_freq = self.min_freq;
        }
        self.current_max_freq = self.current_max_freq.clamp(self.min_freq, self.max_freq);
        self.current_min_freq = self
            .current_min_freq
            .clamp(self.min_freq, self.current_max_freq);
    }

    /// One-line description for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "cluster {}: cores {:?}, {}-{} MHz (active {}-{}), governor {}, {} OPPs",
            self.index,
            self.member_cores,
            self.min_freq,
            self.max_freq,
            self.current_min_freq,
            self.current_max_freq,
            self.governor,
            self.available_frequencies.len(),
        )
    }
}

/// Observable state of a single core.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Core {
    pub core_number: u32,
    /// Current frequency in MHz; 0 when offline or unreadable.
    pub current_freq: Mhz,
    pub is_online: bool,
    /// Index of the owning cluster (lookup only).
    pub cluster_index: usize,
}

/// Per-cluster data in raw sysfs units, before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCluster {
    pub member_cores: Vec<u32>,
    pub min_freq: u64,
    pub max_freq: u64,
    pub current_min_freq: u64,
    pub current_max_freq: u64,
    pub governor: Option<String>,
    pub available_governors: Vec<String>,
    pub available_frequencies: Vec<u64>,
}

impl RawCluster {
    /// The hardware ceiling, or the best stand-in when it was unreadable.
    fn effective_max(&self) -> u64 {
        if self.max_freq > 0 {
            return self.max_freq;
        }
        self.available_frequencies
            .iter()
            .copied()
            .chain([self.current_max_freq])
            .max()
            .unwrap_or(0)
    }

    /// Returns `true` if this cluster's frequencies look like kHz.
    pub fn is_khz(&self) -> bool {
        self.effective_max() > KHZ_DETECTION_THRESHOLD
    }

    /// Converts into a [`Cluster`] with MHz fields, sorted members,
    /// defaulted governor data, and clamped bounds.
    pub fn normalize(self, index: usize) -> Cluster {
        let khz = self.is_khz();
        let max_freq = self.effective_max();
        let conv = |v: u64| -> Mhz {
            if khz {
                khz_to_mhz(v)
            } else {
                v.min(u32::MAX as u64) as Mhz
            }
        };

        let mut member_cores = self.member_cores;
        member_cores.sort_unstable();
        member_cores.dedup();

        let mut available_frequencies: Vec<Mhz> = self
            .available_frequencies
            .into_iter()
            .map(conv)
            .filter(|&f| f > 0)
            .collect();
        available_frequencies.sort_unstable();
        available_frequencies.dedup();

        let available_governors = if self.available_governors.is_empty() {
            DEFAULT_GOVERNORS.iter().map(|g| g.to_string()).collect()
        } else {
            self.available_governors
        };

        let mut cluster = Cluster {
            index,
            member_cores,
            min_freq: conv(self.min_freq),
            max_freq: conv(max_freq),
            current_min_freq: conv(self.current_min_freq),
            current_max_freq: conv(self.current_max_freq),
            governor: self
                .governor
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| DEFAULT_GOVERNOR.to_string()),
            available_governors,
            detected_frequencies: available_frequencies.clone(),
            available_frequencies,
        };
        cluster.normalize_bounds();
        cluster
    }
}

/// Parses a cpu list such as `"0 1 2 3"`, `"0-3"`, or `"0-1,4-5"`.
pub fn parse_cpu_list(s: &str) -> Option<Vec<u32>> {
    let mut cores = Vec::new();
    for part in s.split(|c: char| c == ',' || c.is_whitespace()) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: u32 = start_s.trim().parse().ok()?;
            let end: u32 = end_s.trim().parse().ok()?;
            if end < start {
                return None;
            }
            cores.extend(start..=end);
        } else {
            cores.push(part.parse().ok()?);
        }
    }
    if cores.is_empty() {
        None
    } else {
        Some(cores)
    }
}
