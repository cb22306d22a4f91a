use crate::error::{ExportError, FetchError};
use crate::model::{RawSnapshot, SampleRecord};
use async_trait::async_trait;

/// Fetches one order book snapshot from an exchange.
///
/// Adapters never retry; a failed fetch costs exactly one tick.
#[async_trait]
pub trait SnapshotAdapter: Send + Sync {
    /// Lowercase exchange identifier used in logs and file names.
    fn exchange(&self) -> &str;

    async fn fetch_snapshot(&self, symbol: &str) -> Result<RawSnapshot, FetchError>;
}

/// Delivers a batch of sample records somewhere durable.
#[async_trait]
pub trait BatchSink: Send + Sync {
    fn name(&self) -> &str;

    /// Exports `batch`, which is ordered by capture time and never empty.
    async fn export(
        &self,
        exchange: &str,
        symbol: &str,
        batch: &[SampleRecord],
    ) -> Result<(), ExportError>;
}
