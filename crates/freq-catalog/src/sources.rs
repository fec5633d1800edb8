// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The six frequency sources.
//!
//! Each reader returns the frequencies it found, in MHz, or the reason it
//! found none. A reader that reads several files succeeds if any file
//! yields a value.

use crate::parse::{parse_frequency_list, parse_opp_summary, parse_time_in_state};
use crate::paths::{expand, CatalogPaths};
use crate::CatalogError;
use cpu_topology::{Cluster, Mhz, SysfsLayout};
use futures::future::join_all;
use priv_exec::{list_dir, read_file, Executor};
use std::fmt;

/// Identifies one frequency source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencySource {
    /// `cpuinfo_{min,max}_freq` of every member core.
    HardwareLimits,
    /// Debugfs OPP summaries.
    OppTable,
    /// List files in the cluster's `policyN` directory.
    PolicyFiles,
    /// Vendor devfreq tables.
    Devfreq,
    /// `stats/time_in_state` histograms.
    TimeInState,
    /// Thermal cooling devices bound to CPUs.
    CoolingDevices,
}

impl FrequencySource {
    pub const ALL: [FrequencySource; 6] = [
        FrequencySource::HardwareLimits,
        FrequencySource::OppTable,
        FrequencySource::PolicyFiles,
        FrequencySource::Devfreq,
        FrequencySource::TimeInState,
        FrequencySource::CoolingDevices,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FrequencySource::HardwareLimits => "hardware-limits",
            FrequencySource::OppTable => "opp-table",
            FrequencySource::PolicyFiles => "policy-files",
            FrequencySource::Devfreq => "devfreq",
            FrequencySource::TimeInState => "time-in-state",
            FrequencySource::CoolingDevices => "cooling-devices",
        }
    }

    /// Whether the source's location identifies the cluster it describes.
    ///
    /// Values from unkeyed sources are only admitted inside the cluster's
    /// hardware range.
    pub fn is_cluster_keyed(&self) -> bool {
        !matches!(
            self,
            FrequencySource::Devfreq | FrequencySource::CoolingDevices
        )
    }
}

impl fmt::Display for FrequencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a reader needs.
pub(crate) struct ReadContext<'a> {
    pub exec: &'a dyn Executor,
    pub layout: &'a SysfsLayout,
    pub paths: &'a CatalogPaths,
    pub cluster: &'a Cluster,
}

impl ReadContext<'_> {
    pub async fn read(&self, source: FrequencySource) -> Result<Vec<Mhz>, CatalogError> {
        match source {
            FrequencySource::HardwareLimits => self.hardware_limits().await,
            FrequencySource::OppTable => self.opp_tables().await,
            FrequencySource::PolicyFiles => self.policy_files().await,
            FrequencySource::Devfreq => self.devfreq().await,
            FrequencySource::TimeInState => self.time_in_state().await,
            FrequencySource::CoolingDevices => self.cooling_devices().await,
        }
    }

    async fn hardware_limits(&self) -> Result<Vec<Mhz>, CatalogError> {
        let paths = self.cluster.member_cores.iter().flat_map(|&core| {
            [
                self.layout.cpufreq_file(core, "cpuinfo_max_freq"),
                self.layout.cpufreq_file(core, "cpuinfo_min_freq"),
            ]
        });
        self.read_all(paths, parse_frequency_list).await
    }

    async fn opp_tables(&self) -> Result<Vec<Mhz>, CatalogError> {
        let paths = self.templated(&self.paths.opp_templates);
        self.read_all(paths, parse_opp_summary).await
    }

    async fn policy_files(&self) -> Result<Vec<Mhz>, CatalogError> {
        let first = self.cluster.first_core();
        let paths = [
            "scaling_available_frequencies",
            "scaling_boost_frequencies",
            "cpuinfo_max_freq",
            "cpuinfo_min_freq",
        ]
        .map(|name| self.layout.policy_file(first, name));
        self.read_all(paths, parse_frequency_list).await
    }

    async fn devfreq(&self) -> Result<Vec<Mhz>, CatalogError> {
        let paths = self.templated(&self.paths.devfreq_templates);
        self.read_all(paths, parse_frequency_list).await
    }

    async fn time_in_state(&self) -> Result<Vec<Mhz>, CatalogError> {
        let first = self.cluster.first_core();
        let paths = self
            .cluster
            .member_cores
            .iter()
            .map(|&core| self.layout.cpufreq_file(core, "stats/time_in_state"))
            .chain([self.layout.policy_file(first, "stats/time_in_state")]);
        self.read_all(paths, parse_time_in_state).await
    }

    async fn cooling_devices(&self) -> Result<Vec<Mhz>, CatalogError> {
        let class = self.layout.thermal_class();
        let entries = list_dir(self.exec, &class)
            .await
            .map_err(|source| CatalogError::Read {
                path: class.clone(),
                source,
            })?;

        let devices: Vec<String> = entries
            .into_iter()
            .filter(|e| e.starts_with("cooling_device"))
            .map(|e| format!("{class}/{e}"))
            .collect();
        if devices.is_empty() {
            return Err(CatalogError::NotPresent("cooling devices".into()));
        }

        let exec = self.exec;
        let typed = join_all(devices.into_iter().map(|dir| async move {
            let kind = read_file(exec, &format!("{dir}/type")).await.ok()?;
            let kind = kind.to_lowercase();
            (kind.contains("cpu") || kind.contains("cluster")).then_some(dir)
        }))
        .await;

        let tables: Vec<String> = typed
            .into_iter()
            .flatten()
            .map(|dir| format!("{dir}/{}", self.paths.cooling_table_file))
            .collect();
        if tables.is_empty() {
            return Err(CatalogError::NotPresent("CPU cooling devices".into()));
        }
        self.read_all(tables, parse_frequency_list).await
    }

    /// Expands templates for every member core, deduplicating the results.
    fn templated(&self, templates: &[String]) -> Vec<String> {
        let mut paths: Vec<String> = templates
            .iter()
            .flat_map(|t| {
                self.cluster
                    .member_cores
                    .iter()
                    .map(move |&core| expand(t, self.cluster.index, core))
            })
            .map(|p| self.layout.resolve(&p))
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Reads `paths` concurrently and unions what `parse` finds.
    ///
    /// Fails only if no file yielded a value; the first error is reported.
    async fn read_all<I>(&self, paths: I, parse: fn(&str) -> Vec<Mhz>) -> Result<Vec<Mhz>, CatalogError>
    where
        I: IntoIterator<Item = String>,
    {
        let exec = self.exec;
        let reads = paths.into_iter().map(|path| async move {
            match read_file(exec, &path).await {
                Ok(text) => {
                    let values = parse(&text);
                    if values.is_empty() {
                        Err(CatalogError::NoValues { path })
                    } else {
                        Ok(values)
                    }
                }
                Err(source) => Err(CatalogError::Read { path, source }),
            }
        });

        let mut found = Vec::new();
        let mut first_error = None;
        for result in join_all(reads).await {
            match result {
                Ok(values) => found.extend(values),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match (found.is_empty(), first_error) {
            (false, _) => Ok(found),
            (true, Some(e)) => Err(e),
            (true, None) => Err(CatalogError::NotPresent("no candidate paths".into())),
        }
    }
}
