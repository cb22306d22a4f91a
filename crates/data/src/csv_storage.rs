use crate::csv_tables::{batch_date, encoding, file_name, render_table, TableKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use depthwatch_core::{BatchSink, ExportError, SampleRecord};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Column of the RFC 3339 capture time in both tables.
const DATETIME_COLUMN: usize = 2;

/// Writes the spread and depth tables under `<root>/<exchange>/`.
///
/// Each export appends only the records captured after the latest row
/// already in the day's spread file. Overlapping batches (retain policy,
/// retried exports) and disjoint ones (clear-on-export) both leave every
/// record in the day's files exactly once.
pub struct CsvSink {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Appends the batch's new records to both tables, creating the files
    /// (with headers) on the first export of the day.
    ///
    /// Returns the paths written; empty when every record was already there.
    ///
    /// # Errors
    /// Returns an error if the directory or files cannot be read or written.
    pub fn write_tables(
        &self,
        exchange: &str,
        symbol: &str,
        batch: &[SampleRecord],
    ) -> Result<Vec<PathBuf>, ExportError> {
        let date = batch_date(batch)
            .ok_or_else(|| ExportError::Encoding("cannot export an empty batch".to_string()))?;
        let dir = self.root.join(exchange);
        fs::create_dir_all(&dir)?;

        let spread_path = dir.join(file_name(exchange, symbol, TableKind::Spread, date));
        let latest = last_written(&spread_path)?;
        let fresh: Vec<SampleRecord> = batch
            .iter()
            .filter(|record| latest.map_or(true, |latest| record.captured_at() > latest))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return Ok(Vec::new());
        }

        [TableKind::Spread, TableKind::Depth]
            .into_iter()
            .map(|kind| {
                let path = dir.join(file_name(exchange, symbol, kind, date));
                let exists = path.exists();
                let content = render_table(&fresh, kind, !exists)?;
                if exists {
                    OpenOptions::new().append(true).open(&path)?.write_all(&content)?;
                } else {
                    fs::write(&path, content)?;
                }
                Ok(path)
            })
            .collect()
    }
}

/// Latest capture time recorded in an existing table, if any.
fn last_written(path: &Path) -> Result<Option<DateTime<Utc>>, ExportError> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = csv::Reader::from_path(path).map_err(encoding)?;
    let mut latest: Option<DateTime<Utc>> = None;
    for row in reader.records() {
        let row = row.map_err(encoding)?;
        let Some(written) = row
            .get(DATETIME_COLUMN)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        else {
            continue;
        };
        let written = written.with_timezone(&Utc);
        latest = Some(latest.map_or(written, |latest| latest.max(written)));
    }
    Ok(latest)
}

#[async_trait]
impl BatchSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn export(
        &self,
        exchange: &str,
        symbol: &str,
        batch: &[SampleRecord],
    ) -> Result<(), ExportError> {
        let _guard = self.write_lock.lock().await;
        let paths = self.write_tables(exchange, symbol, batch)?;
        if paths.is_empty() {
            tracing::debug!("All {} records already written for {}:{}", batch.len(), exchange, symbol);
        } else {
            tracing::debug!("Wrote batch of {} records to {:?}", batch.len(), paths);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record_at;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_export_writes_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());
        let batch = vec![record_at(2025, 3, 14, 9, 0, 0), record_at(2025, 3, 14, 9, 0, 15)];

        sink.export("binance", "BTCUSDT", &batch).await.unwrap();

        let spread = dir.path().join("binance/binance_BTCUSDT_spread_2025-03-14.csv");
        let depth = dir.path().join("binance/binance_BTCUSDT_depth_2025-03-14.csv");
        assert_eq!(fs::read_to_string(spread).unwrap().lines().count(), 3);
        assert_eq!(fs::read_to_string(depth).unwrap().lines().count(), 9);
    }

    #[tokio::test]
    async fn test_overlapping_batches_write_each_record_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());
        let mut batch = vec![record_at(2025, 3, 14, 9, 0, 0)];

        sink.export("okx", "BTC-USDT", &batch).await.unwrap();
        batch.push(record_at(2025, 3, 14, 10, 0, 0));
        sink.export("okx", "BTC-USDT", &batch).await.unwrap();
        sink.export("okx", "BTC-USDT", &batch).await.unwrap();

        let spread = dir.path().join("okx/okx_BTC-USDT_spread_2025-03-14.csv");
        let depth = dir.path().join("okx/okx_BTC-USDT_depth_2025-03-14.csv");
        // header + 2 rows
        assert_eq!(fs::read_to_string(spread).unwrap().lines().count(), 3);
        assert_eq!(fs::read_to_string(depth).unwrap().lines().count(), 9);
    }

    #[tokio::test]
    async fn test_disjoint_batches_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());

        sink.export("okx", "BTC-USDT", &[record_at(2025, 3, 14, 9, 0, 0), record_at(2025, 3, 14, 9, 0, 15)])
            .await
            .unwrap();
        sink.export("okx", "BTC-USDT", &[record_at(2025, 3, 14, 10, 0, 0)]).await.unwrap();

        let spread = fs::read_to_string(dir.path().join("okx/okx_BTC-USDT_spread_2025-03-14.csv")).unwrap();
        let lines: Vec<&str> = spread.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("item,"));
        assert_eq!(lines.iter().filter(|line| line.starts_with("item,")).count(), 1);
        assert!(lines[3].contains("2025-03-14T10:00:00+00:00"));
    }

    #[tokio::test]
    async fn test_new_sink_resumes_existing_day_file() {
        let dir = tempfile::tempdir().unwrap();
        let batch = vec![record_at(2025, 3, 14, 9, 0, 0), record_at(2025, 3, 14, 9, 0, 15)];
        CsvSink::new(dir.path()).export("binance", "BTCUSDT", &batch).await.unwrap();

        let restarted = CsvSink::new(dir.path());
        let mut replay = batch.clone();
        replay.push(record_at(2025, 3, 14, 9, 0, 30));
        restarted.export("binance", "BTCUSDT", &replay).await.unwrap();

        let spread = dir.path().join("binance/binance_BTCUSDT_spread_2025-03-14.csv");
        assert_eq!(fs::read_to_string(spread).unwrap().lines().count(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_exports_from_many_collectors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(CsvSink::new(dir.path()));

        let mut tasks = Vec::new();
        for symbol in ["BTCUSDT", "ETHUSDT", "SOLUSDT"] {
            let sink = sink.clone();
            tasks.push(tokio::spawn(async move {
                let batch = vec![record_at(2025, 3, 14, 9, 0, 0)];
                sink.export("binance", symbol, &batch).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(fs::read_dir(dir.path().join("binance")).unwrap().count(), 6);
    }

    #[tokio::test]
    async fn test_unwritable_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let sink = CsvSink::new(&blocker);

        let err = sink
            .export("binance", "BTCUSDT", &[record_at(2025, 3, 14, 9, 0, 0)])
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
    }
}
