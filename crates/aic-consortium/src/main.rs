//! Command-line entry point for AIC consortium nodes
//!
//! Runs a node and offers offline tools for keys, PIDs and chain audits.

use aic_consortium::{init_tracing, ConsortiumConfig};
use anyhow::Result;
use aic_core::KeyType;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "aic")]
#[command(about = "AIC - consortium ledger for self-certifying identities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "aic.toml")]
    config: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyTypeArg {
    Ed25519,
    P256,
}

impl From<KeyTypeArg> for KeyType {
    fn from(arg: KeyTypeArg) -> Self {
        match arg {
            KeyTypeArg::Ed25519 => KeyType::Ed25519,
            KeyTypeArg::P256 => KeyType::P256,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a consortium node
    Serve,

    /// Generate a consortium key seed
    Keygen {
        /// Signature scheme, defaults to the configured one
        #[arg(long, value_enum)]
        key_type: Option<KeyTypeArg>,
    },

    /// Compute the PID of a genesis document
    Pid {
        /// Genesis document JSON file
        file: PathBuf,
    },

    /// Search nonces for a stronger PID
    Vanity {
        /// Genesis document JSON file
        file: PathBuf,

        /// Nonces to try
        #[arg(short, long, default_value = "100000")]
        attempts: u64,
    },

    /// Replay a signed tick and report every diff
    Audit {
        /// Tick JSON file
        file: PathBuf,

        /// Stop after this tid
        #[arg(long)]
        as_of: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConsortiumConfig::load(Some(&cli.config))?;
    init_tracing(cli.verbose, &config.log_filter);

    match cli.command {
        Commands::Serve => aic_consortium::serve(&config).await?,
        Commands::Keygen { key_type } => {
            commands::keygen(key_type.map_or(config.key_type, KeyType::from))
        }
        Commands::Pid { file } => commands::pid(&config, &file)?,
        Commands::Vanity { file, attempts } => commands::vanity(&config, &file, attempts)?,
        Commands::Audit { file, as_of } => commands::audit(&config, &file, as_of.as_deref())?,
    }

    Ok(())
}
