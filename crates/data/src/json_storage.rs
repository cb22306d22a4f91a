use crate::csv_tables::batch_date;
use async_trait::async_trait;
use depthwatch_core::{BatchSink, ExportError, SampleRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Keeps one pretty-printed JSON array of records per day at
/// `<root>/<exchange>/<exchange>_<symbol>_<date>.json`.
///
/// Records captured after the last one already in the file are appended;
/// older ones are skipped, so re-exported batches are not duplicated.
pub struct JsonSink {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, exchange: &str, symbol: &str, batch: &[SampleRecord]) -> Option<PathBuf> {
        let date = batch_date(batch)?;
        Some(self.root.join(exchange).join(format!(
            "{}_{}_{}.json",
            exchange,
            symbol,
            date.format("%Y-%m-%d")
        )))
    }
}

#[async_trait]
impl BatchSink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    async fn export(
        &self,
        exchange: &str,
        symbol: &str,
        batch: &[SampleRecord],
    ) -> Result<(), ExportError> {
        let path = self
            .path_for(exchange, symbol, batch)
            .ok_or_else(|| ExportError::Encoding("cannot export an empty batch".to_string()))?;

        let _guard = self.write_lock.lock().await;
        let mut records = read_existing(&path)?;
        let latest = records.last().map(SampleRecord::captured_at);
        let before = records.len();
        records.extend(
            batch
                .iter()
                .filter(|record| latest.map_or(true, |latest| record.captured_at() > latest))
                .cloned(),
        );
        let appended = records.len() - before;
        if appended == 0 {
            tracing::debug!("All {} records already in {}", batch.len(), path.display());
            return Ok(());
        }

        let body =
            serde_json::to_vec_pretty(&records).map_err(|e| ExportError::Encoding(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        tracing::debug!("Appended {} records to {}", appended, path.display());
        Ok(())
    }
}

fn read_existing(path: &Path) -> Result<Vec<SampleRecord>, ExportError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let body = fs::read(path)?;
    serde_json::from_slice(&body)
        .map_err(|e| ExportError::Encoding(format!("{}: {e}", path.display())))
}
