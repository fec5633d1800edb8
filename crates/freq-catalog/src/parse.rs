// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Parsers for the text formats the frequency sources read.
//!
//! All parsers are lenient: unparseable tokens are skipped, never fatal.

use cpu_topology::units::{hz_to_mhz, to_mhz_by_magnitude};
use cpu_topology::Mhz;
use once_cell::sync::Lazy;
use regex::Regex;

static OPP_RATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*Hz").unwrap());

/// Extracts every `<n> Hz` rate from an OPP summary and converts it to MHz.
pub fn parse_opp_summary(text: &str) -> Vec<Mhz> {
    OPP_RATE
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<u64>().ok())
        .map(hz_to_mhz)
        .collect()
}

/// Parses a whitespace-separated list, normalising each value by magnitude.
pub fn parse_frequency_list(text: &str) -> Vec<Mhz> {
    text.split_whitespace()
        .filter_map(|w| w.parse::<u64>().ok())
        .map(to_mhz_by_magnitude)
        .collect()
}

/// Parses a `time_in_state` table: `<freq> <ticks>` per line, the frequency
/// being the first token.
pub fn parse_time_in_state(text: &str) -> Vec<Mhz> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|w| w.parse::<u64>().ok())
        .map(to_mhz_by_magnitude)
        .collect()
}

/// Sorts ascending, removes duplicates and drops zero.
pub fn canonicalize(mut freqs: Vec<Mhz>) -> Vec<Mhz> {
    freqs.retain(|&f| f > 0);
    freqs.sort_unstable();
    freqs.dedup();
    freqs
}
