//! Order book snapshot adapters.
//!
//! Each adapter performs one REST call per snapshot and hands back the
//! exchange's levels untouched; normalization happens in the core crate.

pub mod binance;
pub mod bitpin;
pub mod client;
pub mod coinex;
pub mod levels;
pub mod nobitex;
pub mod okx;
pub mod registry;
pub mod wallex;

pub use binance::BinanceAdapter;
pub use bitpin::BitpinAdapter;
pub use client::HttpClient;
pub use coinex::CoinexAdapter;
pub use nobitex::NobitexAdapter;
pub use okx::OkxAdapter;
pub use registry::ExchangeKind;
pub use wallex::WallexAdapter;
