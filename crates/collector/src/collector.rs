//! Order book sampler for one (exchange, symbol) pair.
//!
//! Fetches a snapshot on every aligned tick, normalizes it, computes metrics
//! and appends the record to a private buffer. The buffer is exported once
//! per hour and cleared at each UTC day boundary.

use crate::buffer::SampleBuffer;
use crate::scheduler::{Scheduler, SchedulerAction, SchedulerState};
use crate::shutdown::{triggered_opt, Shutdown};
use crate::types::{CollectorConfig, CollectorEvent, CollectorStats};
use chrono::{DateTime, Utc};
use depthwatch_core::{
    normalize, BatchSink, CollectorError, FetchError, FlushPolicy, MetricsEngine, SampleRecord,
    SnapshotAdapter,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Collector {
    /// Configuration
    config: CollectorConfig,
    adapter: Arc<dyn SnapshotAdapter>,
    sink: Arc<dyn BatchSink>,
    metrics: MetricsEngine,
    scheduler: Scheduler,
    buffer: SampleBuffer,
    /// Optional event channel for monitoring
    event_tx: Option<mpsc::Sender<CollectorEvent>>,
    /// Statistics
    stats: CollectorStats,
    shutdown: Shutdown,
    /// Manager-wide signal, if any
    parent_shutdown: Option<Shutdown>,
}

impl Collector {
    /// Creates a collector after validating its configuration.
    ///
    /// # Errors
    /// Returns `FatalConfiguration` if the configuration is invalid; the
    /// collector is never built in that case.
    pub fn new(
        config: CollectorConfig,
        adapter: Arc<dyn SnapshotAdapter>,
        sink: Arc<dyn BatchSink>,
    ) -> Result<Self, CollectorError> {
        let percentages = config.validate()?;
        let scheduler = Scheduler::new(
            config.settings.interval_seconds,
            config.settings.flush_minute,
            config.settings.poll_interval(),
        );

        Ok(Self {
            config,
            adapter,
            sink,
            metrics: MetricsEngine::new(percentages),
            scheduler,
            buffer: SampleBuffer::new(),
            event_tx: None,
            stats: CollectorStats::default(),
            shutdown: Shutdown::new(),
            parent_shutdown: None,
        })
    }

    /// Sets the event channel for monitoring.
    #[must_use]
    pub fn with_event_channel(mut self, tx: mpsc::Sender<CollectorEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub(crate) fn attach_parent_shutdown(&mut self, shutdown: Shutdown) {
        self.parent_shutdown = Some(shutdown);
    }

    #[must_use]
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    #[must_use]
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Signal that stops this collector when triggered.
    #[must_use]
    pub fn handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Requests cancellation. Idempotent.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Runs until cancelled.
    ///
    /// Cancellation is observed between wakeups; an in-flight fetch or export
    /// is allowed to finish.
    ///
    /// # Errors
    /// Returns an error only when `max_consecutive_failures` is set and that
    /// many ticks in a row failed.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        let source = self.source_name();
        tracing::info!(
            "Starting collector {} (interval {}s, flush minute {}, bands {:?})",
            source,
            self.config.settings.interval_seconds,
            self.config.settings.flush_minute,
            self.metrics.percentages().as_slice()
        );

        self.scheduler.start(Utc::now());
        self.emit_event(CollectorEvent::Started {
            source: source.clone(),
        });

        let result = self.run_loop().await;

        if result.is_ok()
            && self.config.settings.flush_on_shutdown
            && self.buffer.has_undelivered()
        {
            tracing::info!("Exporting remaining buffer for {} before exit", source);
            self.flush().await;
        }

        self.scheduler.stop();
        self.emit_event(CollectorEvent::Stopped {
            source: source.clone(),
        });
        tracing::info!(
            "Collector {} stopped: {} samples, {} skipped ticks, {} exports",
            source,
            self.stats.samples_collected,
            self.stats.ticks_skipped,
            self.stats.exports_succeeded
        );

        result
    }

    async fn run_loop(&mut self) -> anyhow::Result<()> {
        loop {
            if self.is_cancelled() {
                return Ok(());
            }

            self.poll(Utc::now()).await?;

            let wait = self.scheduler.next_wakeup(Utc::now());
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.shutdown.triggered() => {}
                () = triggered_opt(self.parent_shutdown.as_ref()) => {}
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.is_triggered()
            || self
                .parent_shutdown
                .as_ref()
                .is_some_and(Shutdown::is_triggered)
    }

    /// Performs every action the scheduler has due at `now`.
    ///
    /// # Errors
    /// See [`Collector::start`].
    pub async fn poll(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        while let Some(action) = self.scheduler.poll(now) {
            match action {
                SchedulerAction::Reset => self.reset(now).await,
                SchedulerAction::Sample => self.tick(now).await?,
                SchedulerAction::Flush => self.flush().await,
            }
        }
        Ok(())
    }

    async fn reset(&mut self, now: DateTime<Utc>) {
        if self.buffer.has_undelivered() {
            tracing::info!(
                "Exporting {} undelivered records for {} before day rollover",
                self.buffer.undelivered(),
                self.source_name()
            );
            self.flush().await;
            if self.buffer.has_undelivered() {
                tracing::error!(
                    "Dropping {} undelivered records for {} at day rollover",
                    self.buffer.undelivered(),
                    self.source_name()
                );
            }
        }

        let discarded = self.buffer.clear();
        self.stats.day_reset();
        let day = now.date_naive();
        tracing::info!(
            "New UTC day {} for {}, discarded {} buffered records",
            day,
            self.source_name(),
            discarded
        );
        self.emit_event(CollectorEvent::DayRolledOver {
            source: self.source_name(),
            day,
            discarded,
        });
    }

    async fn tick(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        match self.sample(now).await {
            Ok(record) => {
                self.stats.record_sampled(record.captured_at());
                self.buffer.append(record);
                tracing::debug!("{} buffered {} records", self.source_name(), self.buffer.len());
                self.emit_event(CollectorEvent::Sampled {
                    source: self.source_name(),
                    buffered: self.buffer.len(),
                });
            }
            Err(e) => {
                self.stats.tick_skipped();
                tracing::warn!("Skipping tick for {}: {}", self.source_name(), e);
                self.emit_event(CollectorEvent::TickSkipped {
                    source: self.source_name(),
                    reason: e.to_string(),
                });

                let max = self.config.settings.max_consecutive_failures;
                if max > 0 && self.stats.consecutive_failures >= max {
                    tracing::error!(
                        "Max consecutive failures ({}) reached, stopping collector {}",
                        max,
                        self.source_name()
                    );
                    return Err(anyhow::anyhow!(
                        "{} failed {} ticks in a row, last error: {}",
                        self.source_name(),
                        max,
                        e
                    ));
                }
            }
        }
        Ok(())
    }

    /// Fetch, normalize and compute one record stamped with the tick time.
    async fn sample(&self, captured_at: DateTime<Utc>) -> Result<SampleRecord, CollectorError> {
        let timeout = self.config.settings.fetch_timeout();
        let raw = tokio::time::timeout(timeout, self.adapter.fetch_snapshot(&self.config.symbol))
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        let snapshot = normalize(&self.config.exchange, &self.config.symbol, raw, captured_at)?;
        let metrics = self.metrics.compute(&snapshot)?;
        Ok(SampleRecord::new(snapshot, metrics))
    }

    async fn flush(&mut self) {
        let source = self.source_name();
        if self.buffer.is_empty() {
            tracing::debug!("Nothing buffered for {}, skipping export", source);
            return;
        }

        let records = self.buffer.len();
        let result = self
            .sink
            .export(&self.config.exchange, &self.config.symbol, self.buffer.records())
            .await;

        match result {
            Ok(()) => {
                self.stats.export_succeeded();
                match self.config.settings.flush_policy {
                    FlushPolicy::ClearOnExport => self.buffer.discard_exported(records),
                    FlushPolicy::Retain => self.buffer.mark_exported(records),
                }
                tracing::info!(
                    "Exported {} records for {} via {} ({} samples, {} skipped ticks so far)",
                    records,
                    source,
                    self.sink.name(),
                    self.stats.samples_collected,
                    self.stats.ticks_skipped
                );
                self.emit_event(CollectorEvent::Exported { source, records });
            }
            Err(e) => {
                self.stats.export_failed();
                tracing::error!(
                    "Export of {} records for {} failed, keeping buffer: {}",
                    records,
                    source,
                    e
                );
                self.emit_event(CollectorEvent::ExportFailed {
                    source,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Helper to emit events. Never blocks: events are dropped while the
    /// channel is full.
    fn emit_event(&self, event: CollectorEvent) {
        if let Some(ref tx) = self.event_tx {
            if let Err(mpsc::error::TrySendError::Full(event)) = tx.try_send(event) {
                tracing::debug!("Event channel full, dropping {:?}", event);
            }
        }
    }

    /// Returns the source name for logging/events.
    #[must_use]
    pub fn source_name(&self) -> String {
        self.config.source_name()
    }
}
