//! OKX REST order book snapshots.

use crate::client::HttpClient;
use crate::levels::{to_raw_side, WireLevel};
use async_trait::async_trait;
use depthwatch_core::{FetchError, RawSnapshot, SnapshotAdapter};
use serde::Deserialize;

pub const OKX_API_URL: &str = "https://www.okx.com";

const MAX_SIZE: u32 = 400;

#[derive(Debug, Deserialize)]
struct BooksResponse {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<BookData>,
}

#[derive(Debug, Deserialize)]
struct BookData {
    bids: Option<Vec<WireLevel>>,
    asks: Option<Vec<WireLevel>>,
}

/// `GET /api/v5/market/books?instId=BTC-USDT&sz=N`
#[derive(Debug, Clone)]
pub struct OkxAdapter {
    client: HttpClient,
    base_url: String,
    depth_limit: u32,
}

impl OkxAdapter {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: OKX_API_URL.to_string(),
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
impl SnapshotAdapter for OkxAdapter {
    fn exchange(&self) -> &str {
        "okx"
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        let url = format!("{}/api/v5/market/books", self.base_url);
        let query = [
            ("instId", symbol.to_string()),
            ("sz", self.depth_limit.min(MAX_SIZE).to_string()),
        ];
        let response: BooksResponse = self.client.get_json(&url, &query).await?;

        if response.code != "0" {
            return Err(FetchError::invalid(format!(
                "okx error {}: {}",
                response.code, response.msg
            )));
        }
        let book = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::invalid("okx returned no book"))?;

        Ok(RawSnapshot {
            bids: to_raw_side(book.bids),
            asks: to_raw_side(book.asks),
        })
    }
}
