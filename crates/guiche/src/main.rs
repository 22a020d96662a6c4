// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guiche - a ticket queue service for in-person service counters.
//!
//! This is the binary entry point for the Guiche service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

mod reset;
mod serve;

/// Guiche - a ticket queue service for in-person service counters.
#[derive(Parser, Debug)]
#[command(name = "guiche", version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file (overrides the XDG hierarchy).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the ticket service.
    Serve,
    /// Delete every ticket and restart numbering from 1.
    Reset {
        /// Skip the interactive confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            guiche_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("guiche serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Reset { yes }) => {
            if let Err(e) = reset::run_reset(config, yes).await {
                eprintln!("guiche reset failed: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("guiche: use --help for available commands");
        }
    }
}

/// Loads configuration from an explicit path when `--config` was given,
/// otherwise from the XDG hierarchy.
fn load_config(
    path: Option<&Path>,
) -> Result<guiche_config::GuicheConfig, Vec<guiche_config::ConfigError>> {
    match path {
        Some(path) => guiche_config::load_and_validate_path(path),
        None => guiche_config::load_and_validate(),
    }
}
