//! pinsync command-line tool.
//!
//! Reads `alias,new_pin` records from a CSV file, resolves each alias
//! against a Unity-style directory service, pushes the new PIN, and records
//! every outcome in an append-only ledger file.

mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use pinsync_core::config::AppConfig;
use pinsync_core::directory::DirectoryClient;
use pinsync_core::input;
use pinsync_core::ledger::Ledger;
use pinsync_core::pacing::{FixedDelay, NoDelay, Pacer};
use pinsync_core::runner::BatchRunner;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Bulk voicemail PIN updater.
#[derive(Parser)]
#[command(
    name = "pinsync",
    version,
    about = "Bulk-update voicemail PINs on a Unity-style directory service"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "~/.config/pinsync/pinsync.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch PIN update.
    Run {
        /// Input CSV file (overrides the configured path).
        #[arg(long)]
        input: Option<PathBuf>,

        /// Ledger CSV file (overrides the configured path).
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Inter-record delay in milliseconds (overrides the configured value).
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Disable inter-record pacing entirely.
        #[arg(long, conflicts_with = "delay_ms")]
        no_delay: bool,
    },

    /// Validate the configuration and input file. No network traffic.
    Check {
        /// Input CSV file (overrides the configured path).
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = expand_tilde(&cli.config);
    let config =
        AppConfig::load_and_resolve(&config_path).context("failed to load configuration")?;

    logging::init(&config.logging);

    match cli.command {
        Commands::Run {
            input,
            ledger,
            delay_ms,
            no_delay,
        } => cmd_run(config, input, ledger, delay_ms, no_delay).await,
        Commands::Check { input } => cmd_check(config, input),
    }
}

/// Run a batch PIN update.
async fn cmd_run(
    mut config: AppConfig,
    input: Option<PathBuf>,
    ledger: Option<PathBuf>,
    delay_ms: Option<u64>,
    no_delay: bool,
) -> Result<()> {
    if let Some(path) = input {
        config.run.input_file = path;
    }
    if let Some(path) = ledger {
        config.run.ledger_file = path;
    }
    if let Some(millis) = delay_ms {
        config.run.pacing_millis = millis;
    }

    info!(
        input = %config.run.input_file.display(),
        ledger = %config.run.ledger_file.display(),
        "starting batch PIN update"
    );

    let records = input::read_records(&config.run.input_file)
        .context("failed to read input records")?;
    let client =
        DirectoryClient::new(&config.directory).context("failed to create directory client")?;
    let mut ledger =
        Ledger::open(&config.run.ledger_file).context("failed to open ledger")?;

    let pacer: Box<dyn Pacer> = if no_delay {
        Box::new(NoDelay)
    } else {
        Box::new(FixedDelay::from_millis(config.run.pacing_millis))
    };

    let runner = BatchRunner::new(&client, pacer.as_ref(), config.run.resume);
    let summary = runner
        .run(&records, &mut ledger)
        .await
        .context("batch run aborted")?;

    println!("{}", summary);
    println!("Ledger: {}", config.run.ledger_file.display());
    Ok(())
}

/// Pre-flight: validate the configuration and input file.
fn cmd_check(config: AppConfig, input: Option<PathBuf>) -> Result<()> {
    let input_file = input.unwrap_or_else(|| config.run.input_file.clone());

    let records =
        input::read_records(&input_file).context("failed to read input records")?;
    let incomplete = records.iter().filter(|r| !r.is_complete()).count();

    println!("✓ Configuration valid (directory host: {})", config.directory.host);
    println!(
        "✓ Input file {}: {} records ({} with missing data)",
        input_file.display(),
        records.len(),
        incomplete
    );
    Ok(())
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
