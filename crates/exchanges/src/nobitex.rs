//! Nobitex v3 order book snapshots.

use crate::client::HttpClient;
use crate::levels::{to_raw_side, WireLevel};
use async_trait::async_trait;
use depthwatch_core::{FetchError, RawSnapshot, SnapshotAdapter};
use serde::Deserialize;

pub const NOBITEX_API_URL: &str = "https://api.nobitex.ir";

#[derive(Debug, Deserialize)]
struct OrderbookResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    bids: Option<Vec<WireLevel>>,
    asks: Option<Vec<WireLevel>>,
}

/// `GET /v3/orderbook/BTCUSDT`
///
/// The endpoint always returns the full visible book; there is no size
/// parameter.
#[derive(Debug, Clone)]
pub struct NobitexAdapter {
    client: HttpClient,
    base_url: String,
}

impl NobitexAdapter {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: NOBITEX_API_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SnapshotAdapter for NobitexAdapter {
    fn exchange(&self) -> &str {
        "nobitex"
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        let url = format!("{}/v3/orderbook/{}", self.base_url, symbol.to_uppercase());
        let response: OrderbookResponse = self.client.get_json(&url, &[]).await?;

        if response.status != "ok" {
            return Err(FetchError::invalid(format!(
                "nobitex status {}: {}",
                response.status,
                response.message.unwrap_or_default()
            )));
        }

        Ok(RawSnapshot {
            bids: to_raw_side(response.bids),
            asks: to_raw_side(response.asks),
        })
    }
}
