//! collect command: runs one collector per configured market.
//!
//! Collectors share one rate-limited HTTP client per exchange and a single
//! fan-out sink built from `[sinks]`. Ctrl-C (or SIGTERM) stops them all and
//! the command returns once every collector has exited.

use anyhow::{Context, Result};
use clap::Args;
use depthwatch_collector::{Collector, CollectorConfig, CollectorManager, Shutdown};
use depthwatch_core::config_loader::DEFAULT_CONFIG_PATH;
use depthwatch_core::{AppConfig, BatchSink, ConfigLoader, SinkSettings};
use depthwatch_data::{CsvSink, FanoutSink, JsonSink, TelegramSink};
use depthwatch_exchanges::{ExchangeKind, HttpClient};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the collect command.
#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "DEPTHWATCH_CONFIG")]
    pub config: PathBuf,
}

/// Runs every configured collector until a shutdown signal arrives.
///
/// # Errors
/// Returns an error if the configuration is invalid, a sink or client cannot
/// be built, or any collector fails.
pub async fn run_collect(args: CollectArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    tracing::info!(
        "Loaded {} markets from {}",
        config.markets.len(),
        args.config.display()
    );

    let mut manager = build_manager(&config)?;

    let shutdown = manager.shutdown_handle();
    tokio::spawn(wait_for_signal(shutdown));

    manager.start().await?;

    tracing::info!("All collectors stopped");
    Ok(())
}

/// Builds the manager with one collector per market.
///
/// # Errors
/// Returns an error for an unknown exchange, an unbuildable sink or HTTP
/// client, or invalid collector settings.
pub fn build_manager(config: &AppConfig) -> Result<CollectorManager> {
    let sink = build_sink(&config.sinks)?;
    tracing::info!("Exporting to {}", sink.name());

    let mut clients: HashMap<ExchangeKind, HttpClient> = HashMap::new();
    let mut manager = CollectorManager::new();

    for market in &config.markets {
        let kind: ExchangeKind = market.exchange.parse()?;
        let client = match clients.get(&kind) {
            Some(client) => client.clone(),
            None => {
                let client = HttpClient::new(&config.http)
                    .with_context(|| format!("failed to build HTTP client for {kind}"))?;
                clients.insert(kind, client.clone());
                client
            }
        };

        let adapter = kind.build_adapter(client, market.depth_limit);
        let collector_config =
            CollectorConfig::from_settings(kind.as_str(), &market.symbol, &config.collector);
        let collector = Collector::new(collector_config, adapter, sink.clone())
            .with_context(|| format!("invalid collector for {kind}:{}", market.symbol))?;
        manager.add(collector);
    }

    Ok(manager)
}

/// Builds the fan-out sink from `[sinks]`.
///
/// # Errors
/// Returns an error if no sink is configured or the Telegram sink cannot be
/// built (e.g. missing bot token).
pub fn build_sink(settings: &SinkSettings) -> Result<Arc<dyn BatchSink>> {
    let mut sinks: Vec<Arc<dyn BatchSink>> = Vec::new();

    if let Some(csv) = &settings.csv {
        sinks.push(Arc::new(CsvSink::new(&csv.root_dir)));
    }
    if let Some(json) = &settings.json {
        sinks.push(Arc::new(JsonSink::new(&json.root_dir)));
    }
    if let Some(telegram) = &settings.telegram {
        sinks.push(Arc::new(TelegramSink::from_config(telegram)?));
    }

    if sinks.is_empty() {
        anyhow::bail!("no sinks configured, enable at least one of [sinks.csv], [sinks.json], [sinks.telegram]");
    }

    Ok(Arc::new(FanoutSink::new(sinks)))
}

async fn wait_for_signal(shutdown: Shutdown) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, stopping collectors");
                    }
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::error!("Failed to listen for Ctrl+C: {}", e);
                            return;
                        }
                        tracing::info!("Received SIGINT (Ctrl+C), stopping collectors");
                    }
                }
                shutdown.trigger();
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to create SIGTERM handler: {}", e);
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received SIGINT (Ctrl+C), stopping collectors");
            shutdown.trigger();
        }
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    }
}
