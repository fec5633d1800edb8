// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Aggregated CPU temperature and the cluster safety check.

use crate::{ThermalZone, ThermalZoneReader};
use std::sync::Arc;

/// Default safety threshold (degrees Celsius).
pub const DEFAULT_MAX_TEMP: f32 = 75.0;

/// Zone-name fragments identifying CPU-related sensors.
pub const DEFAULT_CPU_KEYWORDS: [&str; 4] = ["cpu", "tsens", "thermal", "soc"];

/// Reduces a set of zones to one CPU temperature.
///
/// Zones whose name contains any keyword (case-insensitive) are averaged.
/// With no match the first zone is used; with no zones at all the result
/// is 0.0, meaning "unknown", which callers treat as safe.
pub fn aggregate_temperature<S: AsRef<str>>(zones: &[ThermalZone], keywords: &[S]) -> f32 {
    let matching: Vec<f32> = zones
        .iter()
        .filter(|z| {
            let name = z.name.to_lowercase();
            keywords
                .iter()
                .any(|k| name.contains(&k.as_ref().to_lowercase()))
        })
        .map(|z| z.temp)
        .collect();

    if !matching.is_empty() {
        return matching.iter().sum::<f32>() / matching.len() as f32;
    }
    zones.first().map(|z| z.temp).unwrap_or(0.0)
}

/// Thermal safety monitor.
pub struct ThermalMonitor {
    reader: Arc<dyn ThermalZoneReader>,
    keywords: Vec<String>,
}

impl ThermalMonitor {
    pub fn new(reader: Arc<dyn ThermalZoneReader>) -> Self {
        Self {
            reader,
            keywords: DEFAULT_CPU_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// All zones, as currently read.
    pub async fn zones(&self) -> Vec<ThermalZone> {
        self.reader.read_zones().await
    }

    /// Current CPU temperature in degrees Celsius; 0.0 if unknown.
    pub async fn current_temperature(&self) -> f32 {
        let zones = self.reader.read_zones().await;
        let temp = aggregate_temperature(&zones, &self.keywords);
        tracing::debug!(zones = zones.len(), temp, "cpu temperature");
        temp
    }

    /// Returns `true` while the CPU is below `max_temp`.
    ///
    /// Temperature is system-wide: every cluster sees the same reading.
    pub async fn is_cluster_safe(&self, cluster: usize, max_temp: f32) -> bool {
        let temp = self.current_temperature().await;
        let safe = temp < max_temp;
        if !safe {
            tracing::warn!(cluster, temp, max_temp, "cluster over thermal limit");
        }
        safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<ThermalZone>);

    #[async_trait::async_trait]
    impl ThermalZoneReader for Fixed {
        async fn read_zones(&self) -> Vec<ThermalZone> {
            self.0.clone()
        }
    }

    fn monitor(zones: Vec<ThermalZone>) -> ThermalMonitor {
        ThermalMonitor::new(Arc::new(Fixed(zones)))
    }

    #[test]
    fn test_keyword_zone_wins_over_battery() {
        let zones = vec![
            ThermalZone::new("tsens0", 42.3),
            ThermalZone::new("battery", 30.1),
        ];
        let t = aggregate_temperature(&zones, &DEFAULT_CPU_KEYWORDS);
        assert!((t - 42.3).abs() < 0.001);
    }

    #[test]
    fn test_matching_zones_are_averaged() {
        let zones = vec![
            ThermalZone::new("CPU-0-0", 40.0),
            ThermalZone::new("battery", 30.0),
            ThermalZone::new("soc_thermal", 50.0),
        ];
        assert_eq!(aggregate_temperature(&zones, &DEFAULT_CPU_KEYWORDS), 45.0);
    }

    #[test]
    fn test_no_match_uses_first_zone() {
        let zones = vec![
            ThermalZone::new("battery", 30.0),
            ThermalZone::new("skin", 35.0),
        ];
        assert_eq!(aggregate_temperature(&zones, &DEFAULT_CPU_KEYWORDS), 30.0);
    }

    #[test]
    fn test_no_zones_is_zero() {
        assert_eq!(aggregate_temperature(&[], &DEFAULT_CPU_KEYWORDS), 0.0);
    }

    #[tokio::test]
    async fn test_is_cluster_safe() {
        let m = monitor(vec![ThermalZone::new("cpu0", 74.9)]);
        assert!(m.is_cluster_safe(0, DEFAULT_MAX_TEMP).await);
        let m = monitor(vec![ThermalZone::new("cpu0", 75.0)]);
        assert!(!m.is_cluster_safe(0, DEFAULT_MAX_TEMP).await);
    }

    #[tokio::test]
    async fn test_unknown_temperature_is_safe() {
        let m = monitor(vec![]);
        assert_eq!(m.current_temperature().await, 0.0);
        assert!(m.is_cluster_safe(2, DEFAULT_MAX_TEMP).await);
    }

    #[tokio::test]
    async fn test_custom_keywords() {
        let m = monitor(vec![
            ThermalZone::new("cpu0", 80.0),
            ThermalZone::new("big-core", 60.0),
        ])
        .with_keywords(vec!["big".into()]);
        assert_eq!(m.current_temperature().await, 60.0);
    }
}
