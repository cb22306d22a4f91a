use crate::error::CollectorError;
use crate::metrics::{DepthPercentages, DEFAULT_DEPTH_PERCENTAGES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Whole-application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub collector: CollectorSettings,
    pub http: HttpSettings,
    pub markets: Vec<MarketConfig>,
    pub sinks: SinkSettings,
}

/// What happens to the buffer after a successful hourly export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Keep accumulating until the next day rollover; each export carries
    /// the whole day so far.
    #[default]
    Retain,
    /// Drop exported records once the sink accepted them.
    ClearOnExport,
}

/// Scheduling and sampling parameters shared by every collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub interval_seconds: u64,
    pub depth_percentages: Vec<f64>,
    pub flush_minute: u32,
    pub poll_interval_ms: u64,
    pub fetch_timeout_secs: u64,
    pub flush_policy: FlushPolicy,
    pub flush_on_shutdown: bool,
    /// 0 means keep going forever.
    pub max_consecutive_failures: u32,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 15,
            depth_percentages: DEFAULT_DEPTH_PERCENTAGES.to_vec(),
            flush_minute: 59,
            poll_interval_ms: 1000,
            fetch_timeout_secs: 10,
            flush_policy: FlushPolicy::default(),
            flush_on_shutdown: false,
            max_consecutive_failures: 0,
        }
    }
}

impl CollectorSettings {
    /// # Errors
    /// Returns `FatalConfiguration` describing the first invalid field.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.interval_seconds == 0 {
            return Err(CollectorError::config("interval_seconds must be positive"));
        }
        if self.flush_minute > 59 {
            return Err(CollectorError::config(format!(
                "flush_minute {} must be within 0..=59",
                self.flush_minute
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(CollectorError::config("poll_interval_ms must be positive"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(CollectorError::config("fetch_timeout_secs must be positive"));
        }
        self.percentages().map(|_| ())
    }

    /// Validated percentage set.
    ///
    /// # Errors
    /// Returns `FatalConfiguration` for an empty or out-of-range set.
    pub fn percentages(&self) -> Result<DepthPercentages, CollectorError> {
        DepthPercentages::new(self.depth_percentages.iter().copied())
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Outbound HTTP settings used by every exchange adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub requests_per_second: u32,
    /// http, https or socks5 proxy URL.
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            requests_per_second: 5,
            proxy: None,
            user_agent: concat!("depthwatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    /// # Errors
    /// Returns `FatalConfiguration` for a zero timeout or rate.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.timeout_secs == 0 {
            return Err(CollectorError::config("http.timeout_secs must be positive"));
        }
        if self.requests_per_second == 0 {
            return Err(CollectorError::config(
                "http.requests_per_second must be positive",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_depth_limit() -> u32 {
    20
}

/// One (exchange, symbol) pair to sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub exchange: String,
    pub symbol: String,
    #[serde(default = "default_depth_limit")]
    pub depth_limit: u32,
}

impl MarketConfig {
    pub fn new(exchange: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            depth_limit: default_depth_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkSettings {
    pub csv: Option<CsvSinkConfig>,
    pub json: Option<JsonSinkConfig>,
    pub telegram: Option<TelegramConfig>,
}

impl SinkSettings {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.csv.is_none() && self.json.is_none() && self.telegram.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvSinkConfig {
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSinkConfig {
    pub root_dir: PathBuf,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Telegram delivery target. The bot token comes from `TELEGRAM_BOT_TOKEN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub chat_id: String,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

impl AppConfig {
    /// Checks the whole configuration before any collector starts.
    ///
    /// Exchange names are resolved later by the adapter registry; here only
    /// their presence is checked.
    ///
    /// # Errors
    /// Returns `FatalConfiguration` describing the first problem found.
    pub fn validate(&self) -> Result<(), CollectorError> {
        self.collector.validate()?;
        self.http.validate()?;

        if self.markets.is_empty() {
            return Err(CollectorError::config("no markets configured"));
        }
        for (index, market) in self.markets.iter().enumerate() {
            if market.exchange.trim().is_empty() || market.symbol.trim().is_empty() {
                return Err(CollectorError::config(format!(
                    "markets[{index}] needs both exchange and symbol"
                )));
            }
            if market.depth_limit == 0 {
                return Err(CollectorError::config(format!(
                    "markets[{index}] depth_limit must be positive"
                )));
            }
        }

        if self.sinks.is_empty() {
            return Err(CollectorError::config("no sinks configured"));
        }
        if let Some(telegram) = &self.sinks.telegram {
            if telegram.chat_id.trim().is_empty() {
                return Err(CollectorError::config("sinks.telegram.chat_id is empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            markets: vec![MarketConfig::new("binance", "BTCUSDT")],
            sinks: SinkSettings {
                csv: Some(CsvSinkConfig {
                    root_dir: PathBuf::from("data"),
                }),
                ..SinkSettings::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let settings = CollectorSettings::default();
        assert_eq!(settings.interval_seconds, 15);
        assert_eq!(settings.flush_minute, 59);
        assert_eq!(settings.depth_percentages, vec![0.0, 2.0, 5.0, 10.0]);
        assert_eq!(settings.flush_policy, FlushPolicy::Retain);
        assert_eq!(settings.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = valid();
        config.collector.interval_seconds = 0;
        assert!(config.validate().unwrap_err().is_fatal());
    }

    #[test]
    fn test_flush_minute_out_of_range_rejected() {
        let mut config = valid();
        config.collector.flush_minute = 60;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("flush_minute"));
    }

    #[test]
    fn test_bad_percentages_rejected() {
        let mut config = valid();
        config.collector.depth_percentages = vec![];
        assert!(config.validate().is_err());

        config.collector.depth_percentages = vec![0.0, -2.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = valid();
        config.collector.fetch_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_markets_rejected() {
        let mut config = valid();
        config.markets.clear();
        assert!(config.validate().unwrap_err().to_string().contains("no markets"));
    }

    #[test]
    fn test_no_sinks_rejected() {
        let mut config = valid();
        config.sinks = SinkSettings::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flush_policy_serde_names() {
        let policy: FlushPolicy = serde_json::from_str(r#""clear_on_export""#).unwrap();
        assert_eq!(policy, FlushPolicy::ClearOnExport);
        assert_eq!(serde_json::to_string(&FlushPolicy::Retain).unwrap(), r#""retain""#);
    }
}
