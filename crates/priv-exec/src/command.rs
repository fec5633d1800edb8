// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Builders for the small shell grammar used against sysfs.
//!
//! Every command the workspace issues is produced here, so the set of
//! shapes a device has to understand stays closed:
//!
//! | Builder | Shape |
//! |---|---|
//! | [`cat`] | `cat <path> 2>/dev/null` |
//! | [`echo_to`] | `echo <value> > <path>` |
//! | [`test_exists`] | `test -e <path>` |
//! | [`ls`] | `ls <path> 2>/dev/null` |
//! | [`all_of`] | `<cmd> && <cmd> && ...` |
//!
//! Paths and values are quoted with `shlex`, so a governor name or a
//! vendor path containing spaces cannot break out of its argument.

use std::borrow::Cow;

/// Quotes a single shell word.
pub fn quote(word: &str) -> String {
    match shlex::try_quote(word) {
        Ok(quoted) => quoted.into_owned(),
        // Only NUL bytes are rejected; sysfs never contains them.
        Err(_) => shlex::try_quote(&word.replace('\0', ""))
            .map(Cow::into_owned)
            .unwrap_or_default(),
    }
}

/// Reads a file, discarding stderr.
pub fn cat(path: &str) -> String {
    format!("cat {} 2>/dev/null", quote(path))
}

/// Writes `value` into `path`.
pub fn echo_to(path: &str, value: &str) -> String {
    format!("echo {} > {}", quote(value), quote(path))
}

/// Succeeds iff `path` exists.
pub fn test_exists(path: &str) -> String {
    format!("test -e {}", quote(path))
}

/// Lists a directory, discarding stderr.
pub fn ls(path: &str) -> String {
    format!("ls {} 2>/dev/null", quote(path))
}

/// Joins commands conjunctively: the batch fails as a whole if any part fails.
pub fn all_of<I, S>(commands: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    commands
        .into_iter()
        .map(|c| c.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" && ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_are_unquoted() {
        assert_eq!(
            cat("/sys/devices/system/cpu/cpu0/cpufreq/scaling_governor"),
            "cat /sys/devices/system/cpu/cpu0/cpufreq/scaling_governor 2>/dev/null"
        );
    }

    #[test]
    fn test_values_with_metacharacters_are_quoted() {
        let cmd = echo_to("/tmp/x", "performance; reboot");
        assert_eq!(cmd, "echo 'performance; reboot' > /tmp/x");
        let words = shlex::split(&cmd).unwrap();
        assert_eq!(words, vec!["echo", "performance; reboot", ">", "/tmp/x"]);
    }

    #[test]
    fn test_all_of() {
        let batch = all_of([echo_to("/a", "1"), echo_to("/b", "2")]);
        assert_eq!(batch, "echo 1 > /a && echo 2 > /b");
    }

    #[test]
    fn test_all_of_single() {
        assert_eq!(all_of(["test -e /a"]), "test -e /a");
    }

    #[test]
    fn test_quote_strips_nul() {
        assert_eq!(quote("a\0b"), "ab");
    }
}
