//! snapshot command: one fetch, printed as spread and depth tables.

use anyhow::{bail, Context, Result};
use clap::Args;
use depthwatch_core::metrics::DEFAULT_DEPTH_PERCENTAGES;
use depthwatch_core::normalizer::normalize_now;
use depthwatch_core::{
    AppConfig, ConfigLoader, DepthPercentages, DerivedMetrics, HttpSettings, MetricsEngine,
    OrderBookSnapshot,
};
use depthwatch_exchanges::{ExchangeKind, HttpClient};
use std::fmt::Write;
use std::path::PathBuf;

/// Arguments for the snapshot command.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Exchange name (binance, okx, coinex, nobitex, wallex, bitpin)
    #[arg(long)]
    pub exchange: String,

    /// Symbol in the exchange's own notation (e.g. BTCUSDT, BTC-USDT)
    #[arg(long)]
    pub symbol: String,

    /// Comma-separated depth percentages
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_DEPTH_PERCENTAGES)]
    pub percentages: Vec<f64>,

    /// Levels to request where the exchange supports it
    #[arg(long, default_value = "20")]
    pub depth_limit: u32,

    /// Config file whose [http] section (timeout, rate, proxy) is used
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Proxy URL (http, https or socks5), overrides the config file
    #[arg(long)]
    pub proxy: Option<String>,
}

/// Fetches one snapshot and prints its metrics.
///
/// # Errors
/// Returns an error for an unknown exchange, invalid percentages, a failed
/// fetch, or a book that cannot be normalized or measured.
pub async fn run_snapshot(args: SnapshotArgs) -> Result<()> {
    let kind: ExchangeKind = args.exchange.parse()?;
    let percentages = DepthPercentages::new(args.percentages.iter().copied())?;

    let client = HttpClient::new(&http_settings(&args)?)?;
    let adapter = kind.build_adapter(client, args.depth_limit);

    tracing::info!("Fetching {} {}", kind, args.symbol);
    let raw = adapter
        .fetch_snapshot(&args.symbol)
        .await
        .with_context(|| format!("failed to fetch {kind}:{}", args.symbol))?;
    let snapshot = normalize_now(kind.as_str(), &args.symbol, raw)?;
    let metrics = MetricsEngine::new(percentages).compute(&snapshot)?;

    print!("{}", format_report(&snapshot, &metrics));
    Ok(())
}

/// `[http]` from `--config` if given, then `--proxy` on top.
///
/// # Errors
/// Returns an error if the config file is missing, unparseable, or its
/// `[http]` section is invalid.
pub fn http_settings(args: &SnapshotArgs) -> Result<HttpSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file {} not found", path.display());
            }
            let config: AppConfig = ConfigLoader::figment(path)
                .extract()
                .with_context(|| format!("failed to parse {}", path.display()))?;
            config.http
        }
        None => HttpSettings::default(),
    };
    if let Some(proxy) = &args.proxy {
        settings.proxy = Some(proxy.clone());
    }
    settings.validate()?;
    Ok(settings)
}

/// Renders the spread summary and the depth band table.
pub fn format_report(snapshot: &OrderBookSnapshot, metrics: &DerivedMetrics) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "\n=== {} {} @ {} ===\n",
        snapshot.exchange,
        snapshot.symbol,
        snapshot.captured_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "  Levels:          {}", snapshot.depth());
    let _ = writeln!(out, "  Best bid:        {}", metrics.best_bid);
    let _ = writeln!(out, "  Best ask:        {}", metrics.best_ask);
    let _ = writeln!(out, "  Spread:          {}", metrics.spread);
    let _ = writeln!(out, "  Reference price: {}", metrics.reference_price);
    let _ = writeln!(out, "  Bid volume:      {}", metrics.total_bid_volume);
    let _ = writeln!(out, "  Ask volume:      {}", metrics.total_ask_volume);

    let _ = writeln!(out, "\n  {:>8}  {:>16}  {:>16}", "Pct", "Bid depth", "Ask depth");
    let _ = writeln!(out, "  {}", "-".repeat(44));
    for band in &metrics.depth {
        let _ = writeln!(
            out,
            "  {:>7}%  {:>16}  {:>16}",
            band.percentage, band.bid_depth, band.ask_depth
        );
    }
    out.push('\n');

    out
}
