//! validate-config command: loads a configuration file and lists its markets.

use anyhow::Result;
use clap::Args;
use depthwatch_core::config_loader::DEFAULT_CONFIG_PATH;
use depthwatch_core::{AppConfig, ConfigLoader};
use depthwatch_exchanges::ExchangeKind;
use std::path::PathBuf;

/// Arguments for the validate-config command.
#[derive(Args, Debug, Clone)]
pub struct ValidateConfigArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "DEPTHWATCH_CONFIG")]
    pub config: PathBuf,
}

/// Validates the configuration and prints a summary.
///
/// # Errors
/// Returns an error if the file cannot be loaded, fails validation, or names
/// an unsupported exchange.
pub fn run_validate_config(args: &ValidateConfigArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    check_exchanges(&config)?;

    println!("{} is valid\n", args.config.display());
    print!("{}", summarize(&config));
    Ok(())
}

/// Rejects markets whose exchange has no adapter.
///
/// # Errors
/// Returns the first unknown exchange name.
pub fn check_exchanges(config: &AppConfig) -> Result<()> {
    for market in &config.markets {
        market.exchange.parse::<ExchangeKind>()?;
    }
    Ok(())
}

fn summarize(config: &AppConfig) -> String {
    let collector = &config.collector;
    let mut lines = vec![
        format!(
            "Interval: {}s, flush at minute {}, policy {:?}",
            collector.interval_seconds, collector.flush_minute, collector.flush_policy
        ),
        format!("Depth percentages: {:?}", collector.depth_percentages),
        format!("Markets ({}):", config.markets.len()),
    ];
    for market in &config.markets {
        lines.push(format!(
            "  {:<10} {:<14} depth_limit={}",
            market.exchange, market.symbol, market.depth_limit
        ));
    }

    let mut sinks = Vec::new();
    if config.sinks.csv.is_some() {
        sinks.push("csv");
    }
    if config.sinks.json.is_some() {
        sinks.push("json");
    }
    if config.sinks.telegram.is_some() {
        sinks.push("telegram");
    }
    lines.push(format!("Sinks: {}", sinks.join(", ")));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
