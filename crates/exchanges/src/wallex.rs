//! Wallex order book snapshots.

use crate::client::HttpClient;
use crate::levels::{to_raw_side, WireLevel};
use async_trait::async_trait;
use depthwatch_core::{FetchError, RawSnapshot, SnapshotAdapter};
use serde::Deserialize;
use serde_json::Value;

pub const WALLEX_API_URL: &str = "https://api.wallex.ir";

#[derive(Debug, Deserialize)]
struct DepthResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WallexBook {
    bid: Option<Vec<WireLevel>>,
    ask: Option<Vec<WireLevel>>,
}

/// `GET /v1/depth?symbol=BTCUSDT`
///
/// Levels are `{price, quantity, sum}` objects. The book sits directly under
/// `result`, or under `result.<SYMBOL>` on the multi-market variant.
#[derive(Debug, Clone)]
pub struct WallexAdapter {
    client: HttpClient,
    base_url: String,
}

impl WallexAdapter {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: WALLEX_API_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn extract_book(result: Value, symbol: &str) -> Result<WallexBook, FetchError> {
    let book = match result {
        Value::Object(mut map) if !map.contains_key("bid") && !map.contains_key("ask") => map
            .remove(symbol)
            .ok_or_else(|| FetchError::invalid(format!("wallex result has no book for {symbol}")))?,
        other => other,
    };
    serde_json::from_value(book).map_err(|e| FetchError::invalid(format!("wallex book: {e}")))
}

#[async_trait]
impl SnapshotAdapter for WallexAdapter {
    fn exchange(&self) -> &str {
        "wallex"
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        let symbol = symbol.to_uppercase();
        let url = format!("{}/v1/depth", self.base_url);
        let response: DepthResponse = self
            .client
            .get_json(&url, &[("symbol", symbol.clone())])
            .await?;

        if response.success == Some(false) {
            return Err(FetchError::invalid(format!(
                "wallex error: {}",
                response.message.unwrap_or_default()
            )));
        }
        let result = response
            .result
            .ok_or_else(|| FetchError::invalid("wallex returned no result"))?;
        let book = extract_book(result, &symbol)?;

        Ok(RawSnapshot {
            bids: to_raw_side(book.bid),
            asks: to_raw_side(book.ask),
        })
    }
}
