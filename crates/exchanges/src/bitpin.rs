//! Bitpin order book snapshots.

use crate::client::HttpClient;
use crate::levels::{to_raw_side, WireLevel};
use async_trait::async_trait;
use depthwatch_core::{FetchError, RawSnapshot, SnapshotAdapter};
use serde::Deserialize;

pub const BITPIN_API_URL: &str = "https://api.bitpin.org";

#[derive(Debug, Deserialize)]
struct OrderbookResponse {
    bids: Option<Vec<WireLevel>>,
    asks: Option<Vec<WireLevel>>,
}

/// `GET /api/v1/mth/orderbook/BTC_USDT/`
#[derive(Debug, Clone)]
pub struct BitpinAdapter {
    client: HttpClient,
    base_url: String,
}

impl BitpinAdapter {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: BITPIN_API_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SnapshotAdapter for BitpinAdapter {
    fn exchange(&self) -> &str {
        "bitpin"
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        let url = format!(
            "{}/api/v1/mth/orderbook/{}/",
            self.base_url,
            symbol.to_uppercase()
        );
        let response: OrderbookResponse = self.client.get_json(&url, &[]).await?;

        Ok(RawSnapshot {
            bids: to_raw_side(response.bids),
            asks: to_raw_side(response.asks),
        })
    }
}
