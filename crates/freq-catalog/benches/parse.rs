// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for frequency table parsing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use freq_catalog::parse::{canonicalize, parse_frequency_list, parse_opp_summary, parse_time_in_state};

fn opp_summary(n: u64) -> String {
    (0..n)
        .map(|i| format!(" {} Hz {} uV\n", 300_000_000 + i * 76_800_000, 580_000 + i * 5_000))
        .collect()
}

fn khz_table(n: u64) -> String {
    (0..n)
        .map(|i| format!("{} {}\n", 300_000 + i * 76_800, i * 17))
        .collect()
}

fn bench_opp_summary(c: &mut Criterion) {
    let text = opp_summary(32);
    c.bench_function("parse_opp_summary_32", |b| {
        b.iter(|| parse_opp_summary(black_box(&text)))
    });
}

fn bench_lists(c: &mut Criterion) {
    let table = khz_table(32);
    let flat = table.replace('\n', " ");
    c.bench_function("parse_time_in_state_32", |b| {
        b.iter(|| parse_time_in_state(black_box(&table)))
    });
    c.bench_function("parse_frequency_list_64", |b| {
        b.iter(|| parse_frequency_list(black_box(&flat)))
    });
}

fn bench_canonicalize(c: &mut Criterion) {
    let merged: Vec<u32> = (0..6).flat_map(|_| (0..32u32).map(|i| 300 + i * 76)).collect();
    c.bench_function("canonicalize_192", |b| {
        b.iter(|| canonicalize(black_box(merged.clone())))
    });
}

criterion_group!(benches, bench_opp_summary, bench_lists, bench_canonicalize);
criterion_main!(benches);
