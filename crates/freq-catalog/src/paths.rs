// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Configurable locations of the vendor-specific frequency tables.

use serde::{Deserialize, Serialize};

/// Path templates for the sources whose location varies by SoC vendor.
///
/// Templates are absolute system paths; `{core}` and `{cluster}` are
/// substituted before the path is rebased onto the sysfs root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPaths {
    /// OPP summary files, one per core.
    pub opp_templates: Vec<String>,
    /// Devfreq `available_frequencies` tables.
    pub devfreq_templates: Vec<String>,
    /// Name of the frequency table inside a CPU cooling device directory.
    pub cooling_table_file: String,
}

impl Default for CatalogPaths {
    fn default() -> Self {
        Self {
            opp_templates: vec!["/sys/kernel/debug/opp/cpu{core}/opp_summary".into()],
            devfreq_templates: vec![
                "/sys/class/devfreq/cpu{core}/available_frequencies".into(),
                "/sys/class/devfreq/cluster{cluster}/available_frequencies".into(),
                "/sys/class/devfreq/cpufreq-cluster{cluster}/available_frequencies".into(),
            ],
            cooling_table_file: "available_frequencies".into(),
        }
    }
}

/// Substitutes `{cluster}` and `{core}` in a template.
pub fn expand(template: &str, cluster: usize, core: u32) -> String {
    template
        .replace("{cluster}", &cluster.to_string())
        .replace("{core}", &core.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand() {
        assert_eq!(
            expand("/sys/class/devfreq/cluster{cluster}/cpu{core}", 2, 7),
            "/sys/class/devfreq/cluster2/cpu7"
        );
        assert_eq!(expand("/plain", 0, 0), "/plain");
    }

    #[test]
    fn test_default_opp_template() {
        let paths = CatalogPaths::default();
        assert_eq!(
            expand(&paths.opp_templates[0], 0, 4),
            "/sys/kernel/debug/opp/cpu4/opp_summary"
        );
    }
}
