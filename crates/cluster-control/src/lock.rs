// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Persistent lock state and its stores.

use crate::ControlError;
use cpu_topology::Mhz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Length of the retry accounting window (one hour).
pub const RETRY_WINDOW_MS: u64 = 3_600_000;

/// Locked bounds of one cluster, in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTarget {
    pub min: Mhz,
    pub max: Mhz,
}

impl ClusterTarget {
    pub fn new(min: Mhz, max: Mhz) -> Self {
        Self { min, max }
    }

    /// Returns `true` if both bounds are within `tolerance` of the observed ones.
    pub fn matches(&self, observed_min: Mhz, observed_max: Mhz, tolerance: Mhz) -> bool {
        self.min.abs_diff(observed_min) <= tolerance && self.max.abs_diff(observed_max) <= tolerance
    }
}

/// How a lock reacts to temperature.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockPolicy {
    /// Hold the target regardless of temperature.
    #[default]
    Manual,
    /// Lower the ceiling while the CPU is at or above `max_temp`.
    ThermalAdaptive { max_temp: f32 },
}

/// Attempt counter over a sliding one-hour window.
///
/// The window is anchored at the previous attempt: an attempt more than
/// one window after the last one starts a fresh count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryBudget {
    pub count: u32,
    pub last_attempt_ms: Option<u64>,
}

impl RetryBudget {
    /// Records an attempt at `now_ms` using the one-hour window.
    pub fn record_attempt(self, now_ms: u64) -> Self {
        self.record_attempt_within(now_ms, RETRY_WINDOW_MS)
    }

    /// Records an attempt at `now_ms` using a window of `window_ms`.
    pub fn record_attempt_within(self, now_ms: u64, window_ms: u64) -> Self {
        let count = if self.window_expired(now_ms, window_ms) {
            1
        } else {
            self.count.saturating_add(1)
        };
        Self {
            count,
            last_attempt_ms: Some(now_ms),
        }
    }

    /// Returns `true` if `max` attempts were already made in the current window.
    pub fn is_exhausted(&self, now_ms: u64, window_ms: u64, max: u32) -> bool {
        !self.window_expired(now_ms, window_ms) && self.count >= max
    }

    fn window_expired(&self, now_ms: u64, window_ms: u64) -> bool {
        match self.last_attempt_ms {
            Some(last) => now_ms.saturating_sub(last) > window_ms,
            None => true,
        }
    }
}

/// Everything the orchestrator remembers between calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LockState {
    pub is_locked: bool,
    /// Locked bounds, by cluster index.
    pub targets: BTreeMap<usize, ClusterTarget>,
    pub policy: LockPolicy,
    pub retry: RetryBudget,
    /// Temperature observed at the last lock or enforcement pass (°C).
    pub last_temperature: Option<f32>,
}

impl LockState {
    pub fn target(&self, cluster: usize) -> Option<ClusterTarget> {
        self.targets.get(&cluster).copied()
    }
}

/// Narrow persistence interface for [`LockState`].
pub trait LockStore: Send + Sync {
    fn get(&self) -> Result<Option<LockState>, ControlError>;
    fn set(&self, state: &LockState) -> Result<(), ControlError>;
    fn clear(&self) -> Result<(), ControlError>;
}

/// Keeps the lock state for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    state: Mutex<Option<LockState>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<LockState>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LockStore for MemoryLockStore {
    fn get(&self) -> Result<Option<LockState>, ControlError> {
        Ok(self.slot().clone())
    }

    fn set(&self, state: &LockState) -> Result<(), ControlError> {
        *self.slot() = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ControlError> {
        *self.slot() = None;
        Ok(())
    }
}

/// Persists the lock state as a JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileLockStore {
    path: PathBuf,
}

impl JsonFileLockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, action: &str, e: impl std::fmt::Display) -> ControlError {
        ControlError::Store(format!("cannot {action} '{}': {e}", self.path.display()))
    }
}

impl LockStore for JsonFileLockStore {
    fn get(&self) -> Result<Option<LockState>, ControlError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.store_error("read", e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| self.store_error("parse", e))
    }

    fn set(&self, state: &LockState) -> Result<(), ControlError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.store_error("create parent of", e))?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|e| self.store_error("encode", e))?;
        // The document is replaced atomically, never truncated in place.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.store_error("write", e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.store_error("replace", e))
    }

    fn clear(&self) -> Result<(), ControlError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.store_error("remove", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = RETRY_WINDOW_MS;

    #[test]
    fn test_first_attempt_counts_one() {
        let b = RetryBudget::default().record_attempt(1_000);
        assert_eq!(b.count, 1);
        assert_eq!(b.last_attempt_ms, Some(1_000));
    }

    #[test]
    fn test_attempts_within_hour_accumulate() {
        let b = RetryBudget::default()
            .record_attempt(0)
            .record_attempt(10_000)
            .record_attempt(HOUR);
        assert_eq!(b.count, 3);
    }

    #[test]
    fn test_attempt_after_hour_resets() {
        let b = RetryBudget {
            count: 4,
            last_attempt_ms: Some(0),
        }
        .record_attempt(HOUR + 1);
        assert_eq!(b.count, 1);
        assert_eq!(b.last_attempt_ms, Some(HOUR + 1));
    }

    #[test]
    fn test_exhaustion() {
        let b = RetryBudget {
            count: 5,
            last_attempt_ms: Some(1_000),
        };
        assert!(b.is_exhausted(2_000, HOUR, 5));
        assert!(!b.is_exhausted(2_000, HOUR, 6));
        assert!(!b.is_exhausted(1_000 + HOUR + 1, HOUR, 5));
        assert!(!RetryBudget::default().is_exhausted(0, HOUR, 5));
    }

    #[test]
    fn test_target_tolerance() {
        let t = ClusterTarget::new(1000, 2000);
        assert!(t.matches(1030, 1950, 50));
        assert!(!t.matches(1000, 1949, 50));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryLockStore::new();
        assert_eq!(store.get().unwrap(), None);
        let mut state = LockState {
            is_locked: true,
            ..Default::default()
        };
        state.targets.insert(2, ClusterTarget::new(1200, 2400));
        store.set(&state).unwrap();
        assert_eq!(store.get().unwrap(), Some(state));
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_json_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/lock.json");
        let store = JsonFileLockStore::new(&path);
        assert_eq!(store.get().unwrap(), None);

        let mut state = LockState {
            is_locked: true,
            policy: LockPolicy::ThermalAdaptive { max_temp: 70.0 },
            retry: RetryBudget::default().record_attempt(5),
            last_temperature: Some(41.5),
            ..Default::default()
        };
        state.targets.insert(0, ClusterTarget::new(300, 1804));
        state.targets.insert(2, ClusterTarget::new(844, 2841));
        store.set(&state).unwrap();

        let reopened = JsonFileLockStore::new(&path);
        assert_eq!(reopened.get().unwrap(), Some(state));

        reopened.clear().unwrap();
        assert!(!path.exists());
        reopened.clear().unwrap();
    }

    #[test]
    fn test_json_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lock.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileLockStore::new(&path).get(),
            Err(ControlError::Store(_))
        ));
    }
}
