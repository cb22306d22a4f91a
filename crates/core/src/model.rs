//! Order book snapshot data model.
//!
//! Raw types mirror what an exchange adapter hands over; canonical types are
//! produced by the normalizer and consumed by the metrics engine and sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A price or volume exactly as the exchange sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One raw (price, volume) level; either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLevel {
    pub price: Option<RawValue>,
    pub volume: Option<RawValue>,
}

impl RawLevel {
    /// Creates a level from any price/volume representation.
    pub fn new(price: impl Into<RawValue>, volume: impl Into<RawValue>) -> Self {
        Self {
            price: Some(price.into()),
            volume: Some(volume.into()),
        }
    }

    /// A level with neither price nor volume.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            price: None,
            volume: None,
        }
    }
}

/// Raw order book as returned by a snapshot adapter.
///
/// `None` means the payload carried no such field at all, which is distinct
/// from an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub bids: Option<Vec<RawLevel>>,
    pub asks: Option<Vec<RawLevel>>,
}

impl RawSnapshot {
    /// Creates a snapshot with both sides present.
    #[must_use]
    pub fn new(bids: Vec<RawLevel>, asks: Vec<RawLevel>) -> Self {
        Self {
            bids: Some(bids),
            asks: Some(asks),
        }
    }

    /// Builds a raw snapshot from numeric `(price, volume)` pairs.
    #[must_use]
    pub fn from_pairs(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> Self {
        let convert = |levels: &[(f64, f64)]| {
            levels
                .iter()
                .map(|&(price, volume)| RawLevel::new(price, volume))
                .collect()
        };
        Self::new(convert(bids), convert(asks))
    }
}

/// Canonical level. Padding levels have neither price nor volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: Option<f64>,
    pub volume: Option<f64>,
}

impl Level {
    #[must_use]
    pub const fn new(price: f64, volume: f64) -> Self {
        Self {
            price: Some(price),
            volume: Some(volume),
        }
    }

    /// Sentinel used to pad the shorter side.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            price: None,
            volume: None,
        }
    }

    /// True when the level carries neither a price nor a volume.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.price.is_none() && self.volume.is_none()
    }

    /// Volume contribution; absent volume counts as zero.
    #[must_use]
    pub fn volume_or_zero(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }
}

/// Canonical order book snapshot with equal-length sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub exchange: String,
    pub symbol: String,
    pub captured_at: DateTime<Utc>,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

impl OrderBookSnapshot {
    /// Number of rows (both sides have this length).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.bids.len()
    }

    /// Bid levels that carry a price.
    pub fn priced_bids(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        priced(&self.bids)
    }

    /// Ask levels that carry a price.
    pub fn priced_asks(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        priced(&self.asks)
    }
}

fn priced(levels: &[Level]) -> impl Iterator<Item = (f64, f64)> + '_ {
    levels
        .iter()
        .filter_map(|level| level.price.map(|price| (price, level.volume_or_zero())))
}

impl From<&OrderBookSnapshot> for RawSnapshot {
    fn from(snapshot: &OrderBookSnapshot) -> Self {
        let convert = |levels: &[Level]| {
            levels
                .iter()
                .map(|level| RawLevel {
                    price: level.price.map(RawValue::Number),
                    volume: level.volume.map(RawValue::Number),
                })
                .collect()
        };
        Self::new(convert(&snapshot.bids), convert(&snapshot.asks))
    }
}

/// Volume available within one percentage band of the best prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthBand {
    pub percentage: f64,
    pub bid_depth: f64,
    pub ask_depth: f64,
}

/// Metrics derived from one canonical snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub best_bid: f64,
    pub best_ask: f64,
    /// `best_ask - best_bid`; negative for a crossed source book.
    pub spread: f64,
    /// Median of every priced bid and ask level.
    pub reference_price: f64,
    pub total_bid_volume: f64,
    pub total_ask_volume: f64,
    /// One band per configured percentage, ascending.
    pub depth: Vec<DepthBand>,
}

impl DerivedMetrics {
    /// Looks up the band computed for `percentage`.
    #[must_use]
    pub fn depth_at(&self, percentage: f64) -> Option<&DepthBand> {
        self.depth
            .iter()
            .find(|band| (band.percentage - percentage).abs() < f64::EPSILON)
    }
}

/// Atomic unit stored in a sample buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub snapshot: OrderBookSnapshot,
    pub metrics: DerivedMetrics,
}

impl SampleRecord {
    #[must_use]
    pub const fn new(snapshot: OrderBookSnapshot, metrics: DerivedMetrics) -> Self {
        Self { snapshot, metrics }
    }

    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.snapshot.captured_at
    }
}
