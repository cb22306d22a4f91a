//! Binance spot REST depth snapshots.

use crate::client::HttpClient;
use crate::levels::{to_raw_side, WireLevel};
use async_trait::async_trait;
use depthwatch_core::{FetchError, RawSnapshot, SnapshotAdapter};
use serde::Deserialize;

pub const BINANCE_API_URL: &str = "https://api.binance.com";

/// Binance caps the depth endpoint at 5000 levels.
const MAX_LIMIT: u32 = 5000;

#[derive(Debug, Deserialize)]
struct DepthResponse {
    bids: Option<Vec<WireLevel>>,
    asks: Option<Vec<WireLevel>>,
}

/// `GET /api/v3/depth?symbol=BTCUSDT&limit=N`
#[derive(Debug, Clone)]
pub struct BinanceAdapter {
    client: HttpClient,
    base_url: String,
    depth_limit: u32,
}

impl BinanceAdapter {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: BINANCE_API_URL.to_string(),
            depth_limit: 20,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_depth_limit(mut self, limit: u32) -> Self {
        self.depth_limit = limit;
        self
    }
}

#[async_trait]
impl SnapshotAdapter for BinanceAdapter {
    fn exchange(&self) -> &str {
        "binance"
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        let url = format!("{}/api/v3/depth", self.base_url);
        let query = [
            ("symbol", symbol.to_uppercase()),
            ("limit", self.depth_limit.min(MAX_LIMIT).to_string()),
        ];
        let response: DepthResponse = self.client.get_json(&url, &query).await?;

        Ok(RawSnapshot {
            bids: to_raw_side(response.bids),
            asks: to_raw_side(response.asks),
        })
    }
}
