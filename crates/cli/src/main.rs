use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{CollectArgs, SnapshotArgs, ValidateConfigArgs};

#[derive(Parser)]
#[command(name = "depthwatch")]
#[command(about = "Order book depth and spread collector", long_about = None)]
struct Cli {
    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one collector per configured market until Ctrl-C
    Collect(CollectArgs),
    /// Fetch a single snapshot and print its metrics
    Snapshot(SnapshotArgs),
    /// Load and validate a configuration file
    ValidateConfig(ValidateConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_file.as_ref())?;

    match cli.command {
        Commands::Collect(args) => commands::run_collect(args).await?,
        Commands::Snapshot(args) => commands::run_snapshot(args).await?,
        Commands::ValidateConfig(args) => commands::run_validate_config(&args)?,
    }

    Ok(())
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}
