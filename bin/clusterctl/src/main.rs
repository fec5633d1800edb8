// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # clusterctl
//!
//! Command-line interface for CPU cluster frequency control.
//!
//! ## Usage
//! ```bash
//! # Show clusters and their frequency catalogs
//! clusterctl detect
//!
//! # Pin the prime cluster to its top two OPPs, lowering it when hot
//! clusterctl lock --cluster 2 --min 2265 --max 2841 --thermal-max 70
//!
//! # Re-apply drifted locks every 30 s
//! clusterctl enforce --every 30
//!
//! # Try anything against a simulated octa-core device
//! clusterctl --dry-run lock --cluster 1 --min 1497 --max 1920
//! ```

mod commands;

use clap::{Parser, Subcommand};
use cpu_topology::Mhz;

#[derive(Parser)]
#[command(
    name = "clusterctl",
    about = "Detect, tune and lock CPU cluster frequencies",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Run against a simulated device instead of the real sysfs.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List detected clusters with their frequency catalogs.
    Detect {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show online state and current frequency of every core.
    Cores,

    /// Write scaling bounds to a cluster (no read-back).
    SetFreq {
        #[arg(short, long)]
        cluster: usize,
        /// Minimum in MHz.
        #[arg(long)]
        min: Mhz,
        /// Maximum in MHz.
        #[arg(long)]
        max: Mhz,
    },

    /// Change a cluster's governor and confirm it by read-back.
    SetGovernor {
        #[arg(short, long)]
        cluster: usize,
        /// Governor name, e.g. "performance".
        governor: String,
    },

    /// Poll until a cluster's active bounds match.
    Verify {
        #[arg(short, long)]
        cluster: usize,
        #[arg(long)]
        min: Mhz,
        #[arg(long)]
        max: Mhz,
    },

    /// Lock a cluster to a frequency range and remember it.
    Lock {
        #[arg(short, long)]
        cluster: usize,
        #[arg(long)]
        min: Mhz,
        #[arg(long)]
        max: Mhz,
        /// Lower the ceiling while the CPU is at or above this temperature (C).
        #[arg(long)]
        thermal_max: Option<f32>,
    },

    /// Restore a cluster's hardware bounds and forget its lock.
    Unlock {
        #[arg(short, long)]
        cluster: usize,
    },

    /// Re-apply drifted locks within the hourly retry budget.
    Enforce {
        /// Repeat every N seconds until interrupted.
        #[arg(long)]
        every: Option<u64>,
    },

    /// Show thermal zones and the aggregated CPU temperature.
    Temp,

    /// Dump what each frequency source contributes per cluster.
    DebugFreq,

    /// One-screen overview of clusters, temperature and locks.
    Status,

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref(), cli.dry_run)?;
    let service = commands::build_service(config, cli.dry_run);

    match cli.command {
        Commands::Detect { json } => commands::detect::execute(&service, json).await,
        Commands::Cores => commands::cores::execute(&service).await,
        Commands::SetFreq { cluster, min, max } => {
            commands::freq::set(&service, cluster, min, max).await
        }
        Commands::SetGovernor { cluster, governor } => {
            commands::freq::set_governor(&service, cluster, &governor).await
        }
        Commands::Verify { cluster, min, max } => {
            commands::freq::verify(&service, cluster, min, max).await
        }
        Commands::Lock {
            cluster,
            min,
            max,
            thermal_max,
        } => commands::lock::lock(&service, cluster, min, max, thermal_max).await,
        Commands::Unlock { cluster } => commands::lock::unlock(&service, cluster).await,
        Commands::Enforce { every } => commands::lock::enforce(&service, every).await,
        Commands::Temp => commands::temp::execute(&service).await,
        Commands::DebugFreq => commands::debug::execute(&service).await,
        Commands::Status => commands::status::execute(&service).await,
        Commands::Config => commands::config::execute(service.config()),
    }
}
