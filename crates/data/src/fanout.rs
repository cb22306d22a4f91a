use async_trait::async_trait;
use depthwatch_core::{BatchSink, ExportError, SampleRecord};
use std::sync::Arc;

/// Exports every batch to several sinks.
///
/// All sinks are attempted even when an earlier one fails; the export fails
/// if any of them did, so the collector keeps the batch for the next window.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn BatchSink>>,
    name: String,
}

impl FanoutSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn BatchSink>>) -> Self {
        let name = sinks
            .iter()
            .map(|sink| sink.name())
            .collect::<Vec<_>>()
            .join("+");
        Self { sinks, name }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl BatchSink for FanoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn export(
        &self,
        exchange: &str,
        symbol: &str,
        batch: &[SampleRecord],
    ) -> Result<(), ExportError> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.export(exchange, symbol, batch).await {
                tracing::warn!("Sink {} failed for {}:{}: {}", sink.name(), exchange, symbol, e);
                failures.push(format!("{}: {}", sink.name(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExportError::delivery(&self.name, failures.join("; ")))
        }
    }
}
