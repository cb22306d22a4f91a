pub mod config;
pub mod config_loader;
pub mod error;
pub mod metrics;
pub mod model;
pub mod normalizer;
pub mod traits;

pub use config::{
    AppConfig, CollectorSettings, CsvSinkConfig, FlushPolicy, HttpSettings, JsonSinkConfig,
    MarketConfig, SinkSettings, TelegramConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{BookSide, CollectorError, ExportError, FetchError};
pub use metrics::{DepthPercentages, MetricsEngine};
pub use model::{
    DepthBand, DerivedMetrics, Level, OrderBookSnapshot, RawLevel, RawSnapshot, RawValue,
    SampleRecord,
};
pub use normalizer::normalize;
pub use traits::{BatchSink, SnapshotAdapter};
