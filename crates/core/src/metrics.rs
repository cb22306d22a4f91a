//! Metrics engine.
//!
//! Computes best prices, spread, reference price, volume totals and
//! depth-at-percentage bands from a canonical snapshot.

use crate::error::{BookSide, CollectorError};
use crate::model::{DepthBand, DerivedMetrics, OrderBookSnapshot};

/// Default percentage bands.
pub const DEFAULT_DEPTH_PERCENTAGES: [f64; 4] = [0.0, 2.0, 5.0, 10.0];

/// Validated, sorted, deduplicated set of depth percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthPercentages(Vec<f64>);

impl DepthPercentages {
    /// Validates and normalizes a percentage set.
    ///
    /// # Errors
    /// Returns `FatalConfiguration` if the set is empty or holds a value that
    /// is not finite or lies outside `0..=100`.
    pub fn new(percentages: impl IntoIterator<Item = f64>) -> Result<Self, CollectorError> {
        let mut values: Vec<f64> = percentages.into_iter().collect();
        if values.is_empty() {
            return Err(CollectorError::config("depth percentage set is empty"));
        }
        if let Some(bad) = values
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 100.0)
        {
            return Err(CollectorError::config(format!(
                "depth percentage {bad} must be within 0..=100"
            )));
        }

        values.sort_by(f64::total_cmp);
        values.dedup();
        Ok(Self(values))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for DepthPercentages {
    fn default() -> Self {
        Self(DEFAULT_DEPTH_PERCENTAGES.to_vec())
    }
}

/// Computes [`DerivedMetrics`] for a fixed set of percentage bands.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    percentages: DepthPercentages,
}

impl MetricsEngine {
    #[must_use]
    pub const fn new(percentages: DepthPercentages) -> Self {
        Self { percentages }
    }

    #[must_use]
    pub const fn percentages(&self) -> &DepthPercentages {
        &self.percentages
    }

    /// Computes all metrics for one snapshot.
    ///
    /// # Errors
    /// Returns `EmptyBook` if either side has no priced level.
    pub fn compute(&self, snapshot: &OrderBookSnapshot) -> Result<DerivedMetrics, CollectorError> {
        let best_bid = best_bid(snapshot).ok_or(CollectorError::EmptyBook(BookSide::Bid))?;
        let best_ask = best_ask(snapshot).ok_or(CollectorError::EmptyBook(BookSide::Ask))?;

        let prices: Vec<f64> = snapshot
            .priced_bids()
            .chain(snapshot.priced_asks())
            .map(|(price, _)| price)
            .collect();
        // Both sides are non-empty here, so the median always exists.
        let reference_price = median(&prices).unwrap_or((best_bid + best_ask) / 2.0);

        let depth = self
            .percentages
            .as_slice()
            .iter()
            .map(|&percentage| depth_band(snapshot, best_bid, best_ask, percentage))
            .collect();

        Ok(DerivedMetrics {
            best_bid,
            best_ask,
            spread: best_ask - best_bid,
            reference_price,
            total_bid_volume: total_volume(snapshot.bids.iter().map(|l| l.volume_or_zero())),
            total_ask_volume: total_volume(snapshot.asks.iter().map(|l| l.volume_or_zero())),
            depth,
        })
    }
}

/// Highest priced bid.
#[must_use]
pub fn best_bid(snapshot: &OrderBookSnapshot) -> Option<f64> {
    snapshot.priced_bids().map(|(price, _)| price).reduce(f64::max)
}

/// Lowest priced ask.
#[must_use]
pub fn best_ask(snapshot: &OrderBookSnapshot) -> Option<f64> {
    snapshot.priced_asks().map(|(price, _)| price).reduce(f64::min)
}

/// Standard median; averages the two middle values for even counts.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn total_volume(volumes: impl Iterator<Item = f64>) -> f64 {
    volumes.sum()
}

/// Volume within `percentage` of the best prices, inclusive bounds.
///
/// Bids count when `price >= best_bid * (1 - p/100)`, asks when
/// `price <= best_ask * (1 + p/100)`.
#[must_use]
pub fn depth_band(
    snapshot: &OrderBookSnapshot,
    best_bid: f64,
    best_ask: f64,
    percentage: f64,
) -> DepthBand {
    let fraction = percentage / 100.0;
    let bid_floor = best_bid * (1.0 - fraction);
    let ask_ceiling = best_ask * (1.0 + fraction);

    let bid_depth = snapshot
        .priced_bids()
        .filter(|&(price, _)| price >= bid_floor)
        .map(|(_, volume)| volume)
        .sum();
    let ask_depth = snapshot
        .priced_asks()
        .filter(|&(price, _)| price <= ask_ceiling)
        .map(|(_, volume)| volume)
        .sum();

    DepthBand {
        percentage,
        bid_depth,
        ask_depth,
    }
}
