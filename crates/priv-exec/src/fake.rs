// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! In-memory device that understands the [`command`](crate::command) grammar.
//!
//! [`FakeDevice`] models a sysfs tree as a flat map of absolute paths to
//! file contents. Directories exist implicitly whenever some file lives
//! below them. It is used by the test suites of every crate in the
//! workspace and by `clusterctl --dry-run`.
//!
//! Hardware quirks can be reproduced on demand:
//! - **write latency**: writes become visible only after a delay, like
//!   cpufreq requests that settle asynchronously;
//! - **write hooks**: rewrite or reject a written value (rounding to the
//!   nearest OPP, refusing a governor);
//! - **failure injection**: any command containing a substring fails.

use crate::{ExecError, Executor};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

type WriteHook = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

#[derive(Debug)]
struct PendingWrite {
    path: String,
    value: String,
    visible_at: Instant,
}

#[derive(Default)]
struct DeviceState {
    files: BTreeMap<String, String>,
    pending: Vec<PendingWrite>,
    commands: Vec<String>,
    writes: Vec<(String, String)>,
    failing: Vec<String>,
    latency: Duration,
    hook: Option<WriteHook>,
}

impl DeviceState {
    fn settle(&mut self) {
        let now = Instant::now();
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|w| w.visible_at <= now);
        self.pending = waiting;
        for w in ready {
            self.files.insert(w.path, w.value);
        }
    }

    fn exists(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        if self.files.contains_key(path) {
            return true;
        }
        let prefix = format!("{path}/");
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    fn children(&self, dir: &str) -> BTreeSet<String> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.files
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, _)| k[prefix.len()..].split('/').next().map(str::to_string))
            .collect()
    }
}

/// A scripted, in-memory sysfs device.
#[derive(Clone, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl std::fmt::Debug for FakeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeDevice")
            .field("files", &state.files.len())
            .field("pending", &state.pending.len())
            .field("commands", &state.commands.len())
            .finish()
    }
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_file`](Self::set_file).
    pub fn with_file(self, path: &str, content: impl Into<String>) -> Self {
        self.set_file(path, content);
        self
    }

    /// Creates or replaces a file.
    pub fn set_file(&self, path: &str, content: impl Into<String>) {
        self.lock().files.insert(path.to_string(), content.into());
    }

    pub fn remove_file(&self, path: &str) {
        self.lock().files.remove(path);
    }

    /// Current content of a file, after applying settled writes.
    pub fn file(&self, path: &str) -> Option<String> {
        let mut state = self.lock();
        state.settle();
        state.files.get(path).cloned()
    }

    /// Delays the visibility of every subsequent write.
    pub fn set_write_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Installs a hook deciding what a write actually stores.
    ///
    /// The hook receives `(path, value)` and returns the stored value, or
    /// `None` to reject the write.
    pub fn set_write_hook<F>(&self, hook: F)
    where
        F: Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.lock().hook = Some(Arc::new(hook));
    }

    /// Makes every command containing `needle` fail.
    pub fn fail_matching(&self, needle: &str) {
        self.lock().failing.push(needle.to_string());
    }

    /// Every command line received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Every attempted write as `(path, value)`, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.lock();
        state.commands.clear();
        state.writes.clear();
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn run(&self, command: &str) -> Result<String, ExecError> {
        let mut state = self.lock();
        state.commands.push(command.to_string());
        state.settle();

        if state.failing.iter().any(|n| command.contains(n.as_str())) {
            return Err(failed(command, "injected failure"));
        }

        let words = shlex::split(command).ok_or_else(|| ExecError::Malformed(command.into()))?;

        let mut stdout = String::new();
        let mut last: Result<(), String> = Ok(());
        let mut connector: Option<&str> = None;

        for segment in split_segments(&words) {
            let skip = match connector {
                Some("&&") => last.is_err(),
                Some("||") => last.is_ok(),
                _ => false,
            };
            if !skip {
                last = run_simple(&mut state, segment.words, &mut stdout);
            }
            connector = segment.connector;
        }

        match last {
            Ok(()) => Ok(stdout),
            Err(reason) => Err(failed(command, &reason)),
        }
    }
}

#[async_trait::async_trait]
impl Executor for FakeDevice {
    async fn execute(&self, command: &str) -> Result<String, ExecError> {
        self.run(command)
    }
}

struct Segment<'a> {
    words: &'a [String],
    connector: Option<&'a str>,
}

fn split_segments(words: &[String]) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (i, w) in words.iter().enumerate() {
        if matches!(w.as_str(), "&&" | "||" | ";") {
            segments.push(Segment {
                words: &words[start..i],
                connector: Some(w.as_str()),
            });
            start = i + 1;
        }
    }
    segments.push(Segment {
        words: &words[start..],
        connector: None,
    });
    segments
}

fn run_simple(state: &mut DeviceState, words: &[String], stdout: &mut String) -> Result<(), String> {
    let words: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| !w.starts_with("2>"))
        .collect();

    match words.as_slice() {
        ["cat", path] => match state.files.get(*path) {
            Some(content) => {
                stdout.push_str(content);
                if !content.ends_with('\n') {
                    stdout.push('\n');
                }
                Ok(())
            }
            None => Err(format!("{path}: No such file or directory")),
        },
        ["test", "-e", path] => {
            if state.exists(path) {
                Ok(())
            } else {
                Err(String::new())
            }
        }
        ["ls", path] => {
            if !state.exists(path) {
                return Err(format!("{path}: No such file or directory"));
            }
            for child in state.children(path) {
                stdout.push_str(&child);
                stdout.push('\n');
            }
            Ok(())
        }
        ["echo", value @ .., ">", path] => {
            let value = value.join(" ");
            state.writes.push((path.to_string(), value.clone()));
            if !state.files.contains_key(*path) {
                return Err(format!("{path}: No such file or directory"));
            }
            let stored = match &state.hook {
                Some(hook) => hook(path, &value),
                None => Some(value),
            };
            let Some(stored) = stored else {
                return Err(format!("{path}: Invalid argument"));
            };
            if state.latency.is_zero() {
                state.files.insert(path.to_string(), stored);
            } else {
                let visible_at = Instant::now() + state.latency;
                state.pending.push(PendingWrite {
                    path: path.to_string(),
                    value: stored,
                    visible_at,
                });
            }
            Ok(())
        }
        ["echo", rest @ ..] => {
            stdout.push_str(&rest.join(" "));
            stdout.push('\n');
            Ok(())
        }
        [] => Ok(()),
        other => Err(format!("unsupported command: {}", other.join(" "))),
    }
}

fn failed(command: &str, reason: &str) -> ExecError {
    ExecError::Failed {
        command: command.to_string(),
        code: Some(1),
        stderr: reason.to_string(),
    }
}
