//! CSV rendering of sample batches.
//!
//! Two tables per batch: a *spread* table with one row per sample and a
//! *depth* table with one row per sample and percentage band.

use chrono::NaiveDate;
use csv::Writer;
use depthwatch_core::{ExportError, SampleRecord};

pub const SPREAD_HEADER: [&str; 10] = [
    "item",
    "date",
    "datetime",
    "timestamp",
    "best_bid",
    "best_ask",
    "spread",
    "reference_price",
    "total_bid_volume",
    "total_ask_volume",
];

pub const DEPTH_HEADER: [&str; 8] = [
    "item",
    "date",
    "datetime",
    "timestamp",
    "reference_price",
    "percentage",
    "bid_depth",
    "ask_depth",
];

/// Which of the two tables a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Spread,
    Depth,
}

impl TableKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spread => "spread",
            Self::Depth => "depth",
        }
    }
}

/// Both tables rendered for one batch.
#[derive(Debug, Clone)]
pub struct RenderedTables {
    pub date: NaiveDate,
    pub spread: Vec<u8>,
    pub depth: Vec<u8>,
}

impl RenderedTables {
    /// Renders a non-empty batch.
    ///
    /// # Errors
    /// Returns `Encoding` for an empty batch or a CSV writer failure.
    pub fn render(batch: &[SampleRecord]) -> Result<Self, ExportError> {
        let date = batch_date(batch)
            .ok_or_else(|| ExportError::Encoding("cannot render an empty batch".to_string()))?;
        Ok(Self {
            date,
            spread: render_spread(batch)?,
            depth: render_depth(batch)?,
        })
    }

    #[must_use]
    pub fn table(&self, kind: TableKind) -> &[u8] {
        match kind {
            TableKind::Spread => &self.spread,
            TableKind::Depth => &self.depth,
        }
    }
}

/// UTC date of the last record, used in file names.
#[must_use]
pub fn batch_date(batch: &[SampleRecord]) -> Option<NaiveDate> {
    batch.last().map(|record| record.captured_at().date_naive())
}

/// `<exchange>_<symbol>_<kind>_<YYYY-MM-DD>.csv`
#[must_use]
pub fn file_name(exchange: &str, symbol: &str, kind: TableKind, date: NaiveDate) -> String {
    format!(
        "{}_{}_{}_{}.csv",
        exchange,
        symbol,
        kind.as_str(),
        date.format("%Y-%m-%d")
    )
}

/// Renders one table; rows only when `header` is false, for appending.
///
/// # Errors
/// Returns `Encoding` if the CSV writer fails.
pub fn render_table(
    batch: &[SampleRecord],
    kind: TableKind,
    header: bool,
) -> Result<Vec<u8>, ExportError> {
    match kind {
        TableKind::Spread => spread_table(batch, header),
        TableKind::Depth => depth_table(batch, header),
    }
}

/// Renders the spread table.
///
/// # Errors
/// Returns `Encoding` if the CSV writer fails.
pub fn render_spread(batch: &[SampleRecord]) -> Result<Vec<u8>, ExportError> {
    spread_table(batch, true)
}

fn spread_table(batch: &[SampleRecord], header: bool) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    if header {
        writer.write_record(SPREAD_HEADER).map_err(encoding)?;
    }

    for record in batch {
        let metrics = &record.metrics;
        let mut row = time_columns(record);
        row.extend([
            metrics.best_bid.to_string(),
            metrics.best_ask.to_string(),
            metrics.spread.to_string(),
            metrics.reference_price.to_string(),
            metrics.total_bid_volume.to_string(),
            metrics.total_ask_volume.to_string(),
        ]);
        writer.write_record(&row).map_err(encoding)?;
    }

    writer.into_inner().map_err(|e| ExportError::Encoding(e.to_string()))
}

/// Renders the depth table.
///
/// # Errors
/// Returns `Encoding` if the CSV writer fails.
pub fn render_depth(batch: &[SampleRecord]) -> Result<Vec<u8>, ExportError> {
    depth_table(batch, true)
}

fn depth_table(batch: &[SampleRecord], header: bool) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    if header {
        writer.write_record(DEPTH_HEADER).map_err(encoding)?;
    }

    for record in batch {
        let reference_price = record.metrics.reference_price.to_string();
        for band in &record.metrics.depth {
            let mut row = time_columns(record);
            row.extend([
                reference_price.clone(),
                band.percentage.to_string(),
                band.bid_depth.to_string(),
                band.ask_depth.to_string(),
            ]);
            writer.write_record(&row).map_err(encoding)?;
        }
    }

    writer.into_inner().map_err(|e| ExportError::Encoding(e.to_string()))
}

/// item, date, datetime, timestamp
fn time_columns(record: &SampleRecord) -> Vec<String> {
    let captured_at = record.captured_at();
    vec![
        record.snapshot.symbol.clone(),
        captured_at.format("%Y-%m-%d").to_string(),
        captured_at.to_rfc3339(),
        format!("{:.3}", captured_at.timestamp_millis() as f64 / 1000.0),
    ]
}

pub(crate) fn encoding(err: csv::Error) -> ExportError {
    ExportError::Encoding(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record_at;

    fn lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_spread_table_one_row_per_sample() {
        let batch = vec![record_at(2025, 3, 14, 9, 0, 0), record_at(2025, 3, 14, 9, 0, 15)];

        let rendered = lines(&render_spread(&batch).unwrap());

        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered[0], SPREAD_HEADER.join(","));
        assert_eq!(
            rendered[1],
            "BTCUSDT,2025-03-14,2025-03-14T09:00:00+00:00,1741942800.000,100,101,1,100.5,3,3"
        );
    }

    #[test]
    fn test_depth_table_one_row_per_band() {
        let batch = vec![record_at(2025, 3, 14, 9, 0, 0), record_at(2025, 3, 14, 9, 0, 15)];

        let rendered = lines(&render_depth(&batch).unwrap());

        // header + 2 samples x 4 default bands
        assert_eq!(rendered.len(), 9);
        assert_eq!(rendered[0], DEPTH_HEADER.join(","));
        assert!(rendered[1].ends_with(",100.5,0,1,1"));
        assert!(rendered[2].ends_with(",100.5,2,3,3"));
    }

    #[test]
    fn test_rows_without_header() {
        let batch = vec![record_at(2025, 3, 14, 9, 0, 0)];

        let spread = lines(&render_table(&batch, TableKind::Spread, false).unwrap());
        let depth = lines(&render_table(&batch, TableKind::Depth, false).unwrap());

        assert_eq!(spread.len(), 1);
        assert!(spread[0].starts_with("BTCUSDT,2025-03-14,"));
        assert_eq!(depth.len(), 4);
    }

    #[test]
    fn test_file_name_uses_last_record_date() {
        let batch = vec![record_at(2025, 3, 14, 23, 59, 45), record_at(2025, 3, 15, 0, 0, 0)];
        let date = batch_date(&batch).unwrap();

        assert_eq!(
            file_name("binance", "BTCUSDT", TableKind::Depth, date),
            "binance_BTCUSDT_depth_2025-03-15.csv"
        );
    }

    #[test]
    fn test_empty_batch_cannot_be_rendered() {
        assert!(matches!(RenderedTables::render(&[]), Err(ExportError::Encoding(_))));
        assert_eq!(batch_date(&[]), None);
    }
}
