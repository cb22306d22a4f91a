//! Per-collector sample buffer.

use depthwatch_core::SampleRecord;

/// Append-only sequence of sample records for the current UTC day.
///
/// Insertion order is sampling order. Owned by exactly one collector.
/// Tracks how many leading records a sink has already accepted.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    records: Vec<SampleRecord>,
    delivered: usize,
}

impl SampleBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: SampleRecord) {
        self.records.push(record);
    }

    /// Current contents, oldest first.
    #[must_use]
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records not yet accepted by any export.
    #[must_use]
    pub fn undelivered(&self) -> usize {
        self.records.len() - self.delivered
    }

    #[must_use]
    pub fn has_undelivered(&self) -> bool {
        self.undelivered() > 0
    }

    /// Marks the oldest `count` records as delivered, keeping them.
    pub fn mark_exported(&mut self, count: usize) {
        self.delivered = self.delivered.max(count.min(self.records.len()));
    }

    /// Removes everything and returns how many records were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.records.len();
        self.records.clear();
        self.delivered = 0;
        dropped
    }

    /// Drops the oldest `count` records after they were exported.
    pub fn discard_exported(&mut self, count: usize) {
        let count = count.min(self.records.len());
        self.records.drain(..count);
        self.delivered = self.delivered.saturating_sub(count);
    }
}
