//! Shared types for collectors.
//!
//! Per-market configuration, monitoring events and statistics.

use chrono::{DateTime, NaiveDate, Utc};
use depthwatch_core::{CollectorError, CollectorSettings, DepthPercentages, FlushPolicy};
use std::time::Duration;

/// Configuration for one (exchange, symbol) collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Exchange identifier, e.g. "binance"
    pub exchange: String,
    /// Symbol in the exchange's own notation
    pub symbol: String,
    /// Scheduling and sampling parameters
    pub settings: CollectorSettings,
}

impl CollectorConfig {
    /// Creates a config with default settings.
    pub fn new(exchange: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::from_settings(exchange, symbol, &CollectorSettings::default())
    }

    /// Creates a config sharing the application-wide collector settings.
    pub fn from_settings(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        settings: &CollectorSettings,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            settings: settings.clone(),
        }
    }

    /// Sets the tick interval in seconds.
    #[must_use]
    pub fn with_interval_seconds(mut self, seconds: u64) -> Self {
        self.settings.interval_seconds = seconds;
        self
    }

    /// Sets the depth percentage bands.
    #[must_use]
    pub fn with_depth_percentages(mut self, percentages: Vec<f64>) -> Self {
        self.settings.depth_percentages = percentages;
        self
    }

    /// Sets the minute of the hour that triggers an export.
    #[must_use]
    pub fn with_flush_minute(mut self, minute: u32) -> Self {
        self.settings.flush_minute = minute;
        self
    }

    /// Sets the fine-grained poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the buffer policy applied after a successful export.
    #[must_use]
    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.settings.flush_policy = policy;
        self
    }

    /// Exports whatever is buffered once more when cancelled.
    #[must_use]
    pub fn with_flush_on_shutdown(mut self, enabled: bool) -> Self {
        self.settings.flush_on_shutdown = enabled;
        self
    }

    /// Sets the number of consecutive failed ticks tolerated (0 = unlimited).
    #[must_use]
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.settings.max_consecutive_failures = max;
        self
    }

    /// Validates the config and returns the normalized percentage set.
    ///
    /// # Errors
    /// Returns `FatalConfiguration` for an empty market or invalid settings.
    pub fn validate(&self) -> Result<DepthPercentages, CollectorError> {
        if self.exchange.trim().is_empty() {
            return Err(CollectorError::config("exchange name is empty"));
        }
        if self.symbol.trim().is_empty() {
            return Err(CollectorError::config("symbol is empty"));
        }
        self.settings.validate()?;
        self.settings.percentages()
    }

    /// Name used in logs and events.
    #[must_use]
    pub fn source_name(&self) -> String {
        format!("{}:{}", self.exchange, self.symbol)
    }
}

/// Events emitted by collectors for monitoring.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorEvent {
    /// Collector loop started
    Started { source: String },
    /// A sample was appended to the buffer
    Sampled { source: String, buffered: usize },
    /// A tick produced no sample
    TickSkipped { source: String, reason: String },
    /// Buffer was cleared for a new UTC day
    DayRolledOver {
        source: String,
        day: NaiveDate,
        discarded: usize,
    },
    /// Sink accepted a batch
    Exported { source: String, records: usize },
    /// Sink rejected a batch; the buffer was kept
    ExportFailed { source: String, error: String },
    /// Collector loop exited
    Stopped { source: String },
}

/// Statistics for a running collector.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Samples appended since start
    pub samples_collected: u64,
    /// Ticks that failed to produce a sample
    pub ticks_skipped: u64,
    /// Failed ticks since the last successful one
    pub consecutive_failures: u32,
    /// Successful exports
    pub exports_succeeded: u64,
    /// Failed exports
    pub exports_failed: u64,
    /// Day rollovers observed
    pub day_resets: u32,
    /// Capture time of the last appended sample
    pub last_sample_time: Option<DateTime<Utc>>,
}

impl CollectorStats {
    /// Records an appended sample.
    pub fn record_sampled(&mut self, captured_at: DateTime<Utc>) {
        self.samples_collected += 1;
        self.consecutive_failures = 0;
        self.last_sample_time = Some(captured_at);
    }

    /// Records a skipped tick.
    pub fn tick_skipped(&mut self) {
        self.ticks_skipped += 1;
        self.consecutive_failures += 1;
    }

    pub fn export_succeeded(&mut self) {
        self.exports_succeeded += 1;
    }

    pub fn export_failed(&mut self) {
        self.exports_failed += 1;
    }

    pub fn day_reset(&mut self) {
        self.day_resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_config_defaults() {
        let config = CollectorConfig::new("binance", "BTCUSDT");

        assert_eq!(config.settings.interval_seconds, 15);
        assert_eq!(config.settings.flush_minute, 59);
        assert_eq!(config.settings.max_consecutive_failures, 0);
        assert_eq!(config.source_name(), "binance:BTCUSDT");
    }

    #[test]
    fn test_collector_config_builder() {
        let config = CollectorConfig::new("okx", "BTC-USDT")
            .with_interval_seconds(5)
            .with_flush_minute(30)
            .with_poll_interval(Duration::from_millis(250))
            .with_flush_policy(FlushPolicy::ClearOnExport)
            .with_max_consecutive_failures(3);

        assert_eq!(config.settings.interval_seconds, 5);
        assert_eq!(config.settings.flush_minute, 30);
        assert_eq!(config.settings.poll_interval_ms, 250);
        assert_eq!(config.settings.flush_policy, FlushPolicy::ClearOnExport);
        assert_eq!(config.settings.max_consecutive_failures, 3);
    }

    #[test]
    fn test_validate_returns_sorted_percentages() {
        let config = CollectorConfig::new("binance", "BTCUSDT").with_depth_percentages(vec![5.0, 0.0, 5.0]);

        let percentages = config.validate().unwrap();

        assert_eq!(percentages.as_slice(), &[0.0, 5.0]);
    }

    #[test]
    fn test_validate_rejects_empty_symbol_and_zero_interval() {
        assert!(CollectorConfig::new("binance", " ").validate().unwrap_err().is_fatal());
        assert!(CollectorConfig::new("binance", "BTCUSDT")
            .with_interval_seconds(0)
            .validate()
            .unwrap_err()
            .is_fatal());
    }

    #[test]
    fn test_collector_stats_tracking() {
        let mut stats = CollectorStats::default();

        stats.tick_skipped();
        stats.tick_skipped();
        assert_eq!(stats.consecutive_failures, 2);

        let now = Utc::now();
        stats.record_sampled(now);
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.samples_collected, 1);
        assert_eq!(stats.ticks_skipped, 2);
        assert_eq!(stats.last_sample_time, Some(now));
    }
}
