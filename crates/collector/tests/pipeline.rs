//! End-to-end collector behavior across flush windows and day boundaries.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use depthwatch_collector::{Collector, CollectorConfig, CollectorEvent, CollectorManager};
use depthwatch_core::{BatchSink, ExportError, FetchError, FlushPolicy, RawSnapshot, SampleRecord, SnapshotAdapter};
use depthwatch_data::{CsvSink, FanoutSink, JsonSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Book whose best bid increases by one on every fetch.
#[derive(Default)]
struct RisingAdapter {
    fetches: AtomicU64,
}

#[async_trait]
impl SnapshotAdapter for RisingAdapter {
    fn exchange(&self) -> &str {
        "rising"
    }

    async fn fetch_snapshot(&self, _symbol: &str) -> Result<RawSnapshot, FetchError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) as f64;
        Ok(RawSnapshot::from_pairs(
            &[(100.0 + n, 5.0), (99.0 + n, 3.0)],
            &[(101.0 + n, 4.0), (102.0 + n, 2.0)],
        ))
    }
}

struct DownAdapter;

#[async_trait]
impl SnapshotAdapter for DownAdapter {
    fn exchange(&self) -> &str {
        "down"
    }

    async fn fetch_snapshot(&self, _symbol: &str) -> Result<RawSnapshot, FetchError> {
        Err(FetchError::Network("connection refused".to_string()))
    }
}

#[derive(Default)]
struct CapturingSink {
    batches: Mutex<Vec<Vec<f64>>>,
}

impl CapturingSink {
    fn batches(&self) -> Vec<Vec<f64>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchSink for CapturingSink {
    fn name(&self) -> &str {
        "capturing"
    }

    async fn export(&self, _exchange: &str, _symbol: &str, batch: &[SampleRecord]) -> Result<(), ExportError> {
        let best_bids = batch.iter().map(|r| r.metrics.best_bid).collect();
        self.batches.lock().unwrap().push(best_bids);
        Ok(())
    }
}

/// Rejects the first `failures` exports, then records like [`CapturingSink`].
struct FlakySink {
    failures_left: Mutex<u32>,
    inner: CapturingSink,
}

impl FlakySink {
    fn new(failures: u32) -> Self {
        Self {
            failures_left: Mutex::new(failures),
            inner: CapturingSink::default(),
        }
    }
}

#[async_trait]
impl BatchSink for FlakySink {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn export(&self, exchange: &str, symbol: &str, batch: &[SampleRecord]) -> Result<(), ExportError> {
        {
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ExportError::delivery("flaky", "chat unavailable"));
            }
        }
        self.inner.export(exchange, symbol, batch).await
    }
}

fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, minute, second).unwrap()
}

/// Polls once per simulated second over `[from, to)`.
async fn simulate(collector: &mut Collector, from: DateTime<Utc>, to: DateTime<Utc>) {
    let mut now = from;
    while now < to {
        collector.poll(now).await.unwrap();
        now += ChronoDuration::seconds(1);
    }
}

#[tokio::test]
async fn test_hour_and_day_boundaries_with_retain_policy() {
    let sink = Arc::new(CapturingSink::default());
    let mut collector = Collector::new(
        CollectorConfig::new("rising", "BTCUSDT"),
        Arc::new(RisingAdapter::default()),
        sink.clone(),
    )
    .unwrap();

    // 22:58:00 .. 00:00:30 spans two flush windows and one midnight.
    simulate(&mut collector, at(10, 22, 58, 0), at(11, 0, 0, 31)).await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 2, "one export per hour");

    // 22:58:00..22:59:45 is 8 ticks.
    assert_eq!(batches[0].len(), 8);
    // Retain policy: second export carries the whole day so far.
    assert_eq!(batches[1].len(), 8 + 240);
    assert_eq!(&batches[1][..8], &batches[0][..]);
    assert!(batches[1].windows(2).all(|w| w[0] < w[1]), "sampling order preserved");

    // Midnight started a fresh buffer: 00:00:00, :15, :30.
    assert_eq!(collector.buffer().len(), 3);
    assert_eq!(collector.stats().day_resets, 1);
}

#[tokio::test]
async fn test_clear_on_export_ships_each_record_once() {
    let sink = Arc::new(CapturingSink::default());
    let config = CollectorConfig::new("rising", "BTCUSDT")
        .with_interval_seconds(5)
        .with_flush_policy(FlushPolicy::ClearOnExport);
    let mut collector = Collector::new(config, Arc::new(RisingAdapter::default()), sink.clone()).unwrap();

    simulate(&mut collector, at(10, 9, 58, 0), at(10, 11, 0, 0)).await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 2);
    let total: usize = batches.iter().map(Vec::len).sum();
    assert_eq!(total, collector.stats().samples_collected as usize);
    assert!(collector.buffer().is_empty());
}

#[tokio::test]
async fn test_clear_on_export_keeps_every_record_in_day_files() {
    let dir = tempfile::tempdir().unwrap();
    let sinks: Vec<Arc<dyn BatchSink>> = vec![
        Arc::new(CsvSink::new(dir.path().join("csv"))),
        Arc::new(JsonSink::new(dir.path().join("json"))),
    ];
    let config = CollectorConfig::new("rising", "BTCUSDT").with_flush_policy(FlushPolicy::ClearOnExport);
    let mut collector =
        Collector::new(config, Arc::new(RisingAdapter::default()), Arc::new(FanoutSink::new(sinks))).unwrap();

    simulate(&mut collector, at(10, 9, 58, 0), at(10, 11, 0, 0)).await;

    assert_eq!(collector.stats().exports_succeeded, 2);
    assert_eq!(collector.stats().samples_collected, 248);

    let spread =
        std::fs::read_to_string(dir.path().join("csv/rising/rising_BTCUSDT_spread_2025-06-10.csv")).unwrap();
    assert_eq!(spread.lines().count(), 1 + 248);
    let json = std::fs::read_to_string(dir.path().join("json/rising/rising_BTCUSDT_2025-06-10.json")).unwrap();
    let records: Vec<SampleRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(records.len(), 248);
    assert!(records.windows(2).all(|w| w[0].captured_at() < w[1].captured_at()));
}

#[tokio::test]
async fn test_failed_last_export_of_day_is_delivered_at_midnight() {
    let sink = Arc::new(FlakySink::new(1));
    let mut collector = Collector::new(
        CollectorConfig::new("rising", "BTCUSDT"),
        Arc::new(RisingAdapter::default()),
        sink.clone(),
    )
    .unwrap();

    simulate(&mut collector, at(10, 23, 58, 0), at(11, 1, 0, 0)).await;

    let batches = sink.inner.batches();
    // 23:59 export failed; midnight rollover delivers those 8, then 00:59 the new day.
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 8);
    assert_eq!(batches[1].len(), 240);
    assert_eq!(collector.stats().samples_collected, 248);
}

#[tokio::test]
async fn test_manager_reports_failed_collector_while_others_keep_running() {
    let (tx, mut rx) = mpsc::channel(256);
    let healthy = Collector::new(
        CollectorConfig::new("rising", "BTCUSDT").with_interval_seconds(1),
        Arc::new(RisingAdapter::default()),
        Arc::new(CapturingSink::default()),
    )
    .unwrap()
    .with_event_channel(tx);
    let failing = Collector::new(
        CollectorConfig::new("down", "BTCUSDT")
            .with_interval_seconds(1)
            .with_max_consecutive_failures(2),
        Arc::new(DownAdapter),
        Arc::new(CapturingSink::default()),
    )
    .unwrap();

    let mut manager = CollectorManager::new();
    manager.add(healthy);
    manager.add(failing);
    let shutdown = manager.shutdown_handle();
    let run = tokio::spawn(async move { manager.start().await });

    tokio::time::sleep(Duration::from_millis(3500)).await;
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("manager exits after shutdown")
        .unwrap();
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("down:BTCUSDT"));

    let mut samples = 0;
    let mut stopped = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            CollectorEvent::Sampled { .. } => samples += 1,
            CollectorEvent::Stopped { .. } => stopped = true,
            _ => {}
        }
    }
    assert!(samples >= 2, "healthy collector kept sampling, got {samples}");
    assert!(stopped);
}
