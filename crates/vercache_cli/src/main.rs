//! VerCache CLI
//!
//! Command-line tools for exercising a versioned cache.
//!
//! # Commands
//!
//! - `simulate` - Sync a cache from a simulated person service with concurrent readers
//! - `replay` - Apply a JSON file of deltas and print the changes since a version

mod commands;
mod person;
mod simulator;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// VerCache command-line tools.
#[derive(Parser)]
#[command(name = "vercache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync a cache from a simulated person service
    Simulate {
        /// Seed for the simulated service
        #[arg(short, long, default_value_t = simulator::DEFAULT_SEED)]
        seed: u64,

        /// Number of sync cycles to run
        #[arg(short, long, default_value = "20")]
        cycles: u64,

        /// Number of concurrent reader threads
        #[arg(short, long, default_value = "2")]
        readers: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Apply a JSON file of deltas and print the resulting changes
    Replay {
        /// Path to a JSON array of deltas
        file: PathBuf,

        /// Print only changes at or after this version
        #[arg(long)]
        since: Option<u64>,

        /// Abort on the first out-of-order delta instead of skipping it
        #[arg(long)]
        strict: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Simulate {
            seed,
            cycles,
            readers,
            format,
        } => {
            commands::simulate::run(seed, cycles, readers, &format)?;
        }
        Commands::Replay {
            file,
            since,
            strict,
            format,
        } => {
            commands::replay::run(&file, since, strict, &format)?;
        }
        Commands::Version => {
            println!("VerCache CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("VerCache Core v{}", vercache_core::VERSION);
        }
    }

    Ok(())
}
