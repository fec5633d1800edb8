// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `clusterctl config`: print the effective configuration.

use cluster_control::ControlConfig;

pub fn execute(config: &ControlConfig) -> anyhow::Result<()> {
    let toml = config
        .to_toml()
        .map_err(|e| anyhow::anyhow!("cannot render config: {e}"))?;
    print!("{toml}");
    Ok(())
}
