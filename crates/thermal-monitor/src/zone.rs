// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Thermal zone reading via `/sys/class/thermal/thermal_zoneN/`.
//!
//! Each zone exposes a `type` (its name, e.g. `tsens_tz_sensor0` or
//! `cpu-1-0-usr`) and a `temp`. Most kernels report `temp` in
//! millidegrees Celsius; a few report whole degrees. Values with an
//! absolute value of 1000 or more are taken to be millidegrees.

use crate::MonitorError;
use cpu_topology::SysfsLayout;
use futures::future::join_all;
use priv_exec::{list_dir, read_file, Executor};
use std::path::Path;
use std::sync::Arc;

/// A readout below this magnitude is already in degrees.
const MILLIDEGREE_THRESHOLD: i64 = 1000;

/// A named temperature readout.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ThermalZone {
    /// The zone's `type`.
    pub name: String,
    /// Temperature in degrees Celsius.
    pub temp: f32,
}

impl ThermalZone {
    pub fn new(name: impl Into<String>, temp: f32) -> Self {
        Self {
            name: name.into(),
            temp,
        }
    }
}

/// Enumerates the thermal zones of a device.
#[async_trait::async_trait]
pub trait ThermalZoneReader: Send + Sync {
    /// Returns every readable zone. Unreadable zones are skipped.
    async fn read_zones(&self) -> Vec<ThermalZone>;
}

/// Parses a `temp` file's content into degrees Celsius.
pub fn parse_temperature(path: &str, content: &str) -> Result<f32, MonitorError> {
    let raw: i64 = content.trim().parse().map_err(|_| MonitorError::ParseError {
        path: path.to_string(),
        detail: format!("expected integer temperature, got '{}'", content.trim()),
    })?;
    if raw.abs() >= MILLIDEGREE_THRESHOLD {
        Ok(raw as f32 / 1000.0)
    } else {
        Ok(raw as f32)
    }
}

fn is_zone_dir(name: &str) -> bool {
    name.strip_prefix("thermal_zone")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn zone_number(name: &str) -> u32 {
    name.trim_start_matches("thermal_zone").parse().unwrap_or(u32::MAX)
}

/// Reads zones directly from the filesystem.
#[derive(Debug, Clone)]
pub struct SysfsThermalReader {
    layout: SysfsLayout,
}

impl SysfsThermalReader {
    pub fn new(layout: SysfsLayout) -> Self {
        Self { layout }
    }
}

#[async_trait::async_trait]
impl ThermalZoneReader for SysfsThermalReader {
    async fn read_zones(&self) -> Vec<ThermalZone> {
        let class = self.layout.thermal_class();
        tokio::task::spawn_blocking(move || read_zones_blocking(Path::new(&class)))
            .await
            .unwrap_or_default()
    }
}

fn read_zones_blocking(class: &Path) -> Vec<ThermalZone> {
    let Ok(entries) = std::fs::read_dir(class) else {
        tracing::debug!("no thermal class at {}", class.display());
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| is_zone_dir(n))
        .collect();
    names.sort_by_key(|n| zone_number(n));

    names
        .iter()
        .filter_map(|zone| {
            let dir = class.join(zone);
            let name = read_sysfs_file(&dir.join("type")).ok()?;
            let temp_path = dir.join("temp");
            let content = read_sysfs_file(&temp_path).ok()?;
            match parse_temperature(&temp_path.display().to_string(), &content) {
                Ok(temp) => Some(ThermalZone::new(name, temp)),
                Err(e) => {
                    tracing::debug!("skipping {zone}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Reads a sysfs file and returns its trimmed content.
pub(crate) fn read_sysfs_file(path: &Path) -> Result<String, MonitorError> {
    if !path.exists() {
        return Err(MonitorError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })
}

/// Reads zones through an [`Executor`], for devices whose thermal class is
/// not readable by this process.
pub struct ShellThermalReader {
    exec: Arc<dyn Executor>,
    layout: SysfsLayout,
}

impl ShellThermalReader {
    pub fn new(exec: Arc<dyn Executor>, layout: SysfsLayout) -> Self {
        Self { exec, layout }
    }

    async fn read_zone(&self, dir: String) -> Result<ThermalZone, MonitorError> {
        let exec = self.exec.as_ref();
        let type_path = format!("{dir}/type");
        let temp_path = format!("{dir}/temp");
        let (name, content) = tokio::join!(read_file(exec, &type_path), read_file(exec, &temp_path));
        let name = name.map_err(|source| MonitorError::ExecFailed {
            path: type_path,
            source,
        })?;
        let content = content.map_err(|source| MonitorError::ExecFailed {
            path: temp_path.clone(),
            source,
        })?;
        Ok(ThermalZone::new(name, parse_temperature(&temp_path, &content)?))
    }
}

#[async_trait::async_trait]
impl ThermalZoneReader for ShellThermalReader {
    async fn read_zones(&self) -> Vec<ThermalZone> {
        let class = self.layout.thermal_class();
        let mut names = match list_dir(self.exec.as_ref(), &class).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("cannot list {class}: {e}");
                return Vec::new();
            }
        };
        names.retain(|n| is_zone_dir(n));
        names.sort_by_key(|n| zone_number(n));

        let reads = names
            .iter()
            .map(|zone| self.read_zone(format!("{class}/{zone}")));
        join_all(reads)
            .await
            .into_iter()
            .filter_map(|r| match r {
                Ok(zone) => Some(zone),
                Err(e) => {
                    tracing::debug!("skipping zone: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Tries each reader in order; the first that yields any zone wins.
pub struct ChainedThermalReader {
    readers: Vec<Arc<dyn ThermalZoneReader>>,
}

impl ChainedThermalReader {
    pub fn new(readers: Vec<Arc<dyn ThermalZoneReader>>) -> Self {
        Self { readers }
    }
}

#[async_trait::async_trait]
impl ThermalZoneReader for ChainedThermalReader {
    async fn read_zones(&self) -> Vec<ThermalZone> {
        for (position, reader) in self.readers.iter().enumerate() {
            let zones = reader.read_zones().await;
            if !zones.is_empty() {
                return zones;
            }
            tracing::debug!(position, "thermal reader found no zones, trying next");
        }
        tracing::warn!("no thermal zone readable by any reader");
        Vec::new()
    }
}
