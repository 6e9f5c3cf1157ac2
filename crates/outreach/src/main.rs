// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outreach - outbound call campaigns with WhatsApp follow-up.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod stats;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use outreach_config::{ConfigError, OutreachConfig};

/// Outreach - outbound call campaigns with WhatsApp follow-up.
#[derive(Parser, Debug)]
#[command(name = "outreach", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the campaign monitor, session router and HTTP gateway.
    Serve,
    /// Validate configuration and report which integrations are set up.
    CheckConfig,
    /// Print batch statistics from the local database.
    Stats {
        /// Only show this group.
        group: Option<String>,
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

fn load(path: Option<&PathBuf>) -> Result<OutreachConfig, Vec<ConfigError>> {
    match path {
        Some(path) => outreach_config::load_and_validate_path(path),
        None => outreach_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            outreach_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::CheckConfig) => {
            serve::print_config_summary(&config);
            Ok(())
        }
        Some(Commands::Stats { group, json, plain }) => {
            stats::run_stats(&config, group.as_deref(), json, plain).await
        }
        None => {
            println!("outreach: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
