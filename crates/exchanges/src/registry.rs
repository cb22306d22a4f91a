//! Exchange name resolution and adapter construction.

use crate::binance::BinanceAdapter;
use crate::bitpin::BitpinAdapter;
use crate::client::HttpClient;
use crate::coinex::CoinexAdapter;
use crate::nobitex::NobitexAdapter;
use crate::okx::OkxAdapter;
use crate::wallex::WallexAdapter;
use depthwatch_core::{CollectorError, SnapshotAdapter};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    Binance,
    Okx,
    Coinex,
    Nobitex,
    Wallex,
    Bitpin,
}

impl ExchangeKind {
    pub const ALL: [Self; 6] = [
        Self::Binance,
        Self::Okx,
        Self::Coinex,
        Self::Nobitex,
        Self::Wallex,
        Self::Bitpin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Okx => "okx",
            Self::Coinex => "coinex",
            Self::Nobitex => "nobitex",
            Self::Wallex => "wallex",
            Self::Bitpin => "bitpin",
        }
    }

    /// Builds the adapter for this exchange.
    ///
    /// `depth_limit` is ignored by exchanges without a size parameter.
    #[must_use]
    pub fn build_adapter(self, client: HttpClient, depth_limit: u32) -> Arc<dyn SnapshotAdapter> {
        match self {
            Self::Binance => Arc::new(BinanceAdapter::new(client).with_depth_limit(depth_limit)),
            Self::Okx => Arc::new(OkxAdapter::new(client).with_depth_limit(depth_limit)),
            Self::Coinex => Arc::new(CoinexAdapter::new(client).with_depth_limit(depth_limit)),
            Self::Nobitex => Arc::new(NobitexAdapter::new(client)),
            Self::Wallex => Arc::new(WallexAdapter::new(client)),
            Self::Bitpin => Arc::new(BitpinAdapter::new(client)),
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeKind {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| {
                CollectorError::config(format!(
                    "unknown exchange '{s}', expected one of: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}
