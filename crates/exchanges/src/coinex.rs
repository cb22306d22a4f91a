//! CoinEx v1 market depth snapshots.

use crate::client::HttpClient;
use crate::levels::{to_raw_side, WireLevel};
use async_trait::async_trait;
use depthwatch_core::{FetchError, RawSnapshot, SnapshotAdapter};
use serde::Deserialize;

pub const COINEX_API_URL: &str = "https://api.coinex.com";

/// Depth sizes the v1 endpoint accepts.
const ALLOWED_LIMITS: [u32; 4] = [5, 10, 20, 50];

#[derive(Debug, Deserialize)]
struct DepthResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<DepthData>,
}

#[derive(Debug, Deserialize)]
struct DepthData {
    bids: Option<Vec<WireLevel>>,
    asks: Option<Vec<WireLevel>>,
}

/// `GET /v1/market/depth?market=btcusdt&merge=0&limit=N`
#[derive(Debug, Clone)]
pub struct CoinexAdapter {
    client: HttpClient,
    base_url: String,
    depth_limit: u32,
}

impl CoinexAdapter {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: COINEX_API_URL.to_string(),
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

    /// Smallest accepted size covering the requested depth.
    fn request_limit(&self) -> u32 {
        ALLOWED_LIMITS
            .into_iter()
            .find(|&limit| limit >= self.depth_limit)
            .unwrap_or(ALLOWED_LIMITS[ALLOWED_LIMITS.len() - 1])
    }
}

#[async_trait]
impl SnapshotAdapter for CoinexAdapter {
    fn exchange(&self) -> &str {
        "coinex"
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        let url = format!("{}/v1/market/depth", self.base_url);
        let query = [
            ("market", symbol.to_lowercase()),
            ("merge", "0".to_string()),
            ("limit", self.request_limit().to_string()),
        ];
        let response: DepthResponse = self.client.get_json(&url, &query).await?;

        if response.code != 0 {
            return Err(FetchError::invalid(format!(
                "coinex error {}: {}",
                response.code, response.message
            )));
        }
        let data = response
            .data
            .ok_or_else(|| FetchError::invalid("coinex returned no data"))?;

        Ok(RawSnapshot {
            bids: to_raw_side(data.bids),
            asks: to_raw_side(data.asks),
        })
    }
}
