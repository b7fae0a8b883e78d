//! Warden CLI
//!
//! Replays a custody operation script against a fresh module and prints each
//! step's outcome followed by the fact journal as JSON lines.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use warden_core::{CancelPolicy, ConfigValidation, CustodyConfig};

mod replay;
mod script;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden - guardian-recoverable custody tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an operation script and print the audit trail
    Replay {
        /// Script file (JSON)
        script: PathBuf,

        /// Custody config file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override who may cancel an in-progress recovery
        #[arg(long)]
        cancel_policy: Option<CancelPolicy>,

        /// Exit non-zero if any step was rejected
        #[arg(long)]
        expect_success: bool,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Replay {
            script,
            config,
            cancel_policy,
            expect_success,
        } => {
            let mut config = CustodyConfig::resolve(config.as_deref())
                .context("failed to load custody config")?;
            if let Some(policy) = cancel_policy {
                config.cancel_policy = policy;
            }
            config.validate()?;

            let script = script::Script::load(&script)?;
            let report = replay::run(&script, config)?;
            report.print()?;

            if expect_success && report.rejected() > 0 {
                bail!("{} of {} steps were rejected", report.rejected(), report.outcomes.len());
            }
        }
    }

    Ok(())
}
