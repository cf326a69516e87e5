//! Completion buffer and batch sorter.
//!
//! Resolved records are held until every resolution registered with
//! [`CompletionBuffer::expect`] has come back, then released as one sorted
//! batch. Completion is tracked by per-category pending counts, decremented as
//! each record (real or default-revision) is accepted.
//!
//! Callers must register a whole batch before accepting any record of it,
//! otherwise a fast resolution can drain the count early.

use std::collections::BTreeMap;

use arxivdigest_shared::{EmittedRecord, ResolvedRecord};
use tracing::{debug, warn};

/// Holds resolved records per category until their batch is complete.
#[derive(Debug, Default)]
pub struct CompletionBuffer {
    pending: BTreeMap<String, usize>,
    records: Vec<ResolvedRecord>,
}

impl CompletionBuffer {
    /// Empty buffer with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `count` outstanding resolutions for `category`.
    pub fn expect(&mut self, category: &str, count: usize) {
        if count == 0 {
            return;
        }
        *self.pending.entry(category.to_string()).or_default() += count;
    }

    /// Buffer a resolved record. Returns the sorted batch once nothing is pending.
    pub fn accept(&mut self, record: ResolvedRecord) -> Option<Vec<EmittedRecord>> {
        let category = record.stub.source.code.clone();
        match self.pending.get_mut(&category) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(&category);
                }
            }
            None => {
                warn!(%category, identifier = %record.stub.identifier, "record for category with nothing pending");
            }
        }
        self.records.push(record);

        if self.pending.is_empty() {
            Some(self.release())
        } else {
            None
        }
    }

    /// Outstanding resolutions across all categories.
    pub fn pending(&self) -> usize {
        self.pending.values().sum()
    }

    /// Whether no records are buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn release(&mut self) -> Vec<EmittedRecord> {
        let mut batch = std::mem::take(&mut self.records);
        batch.sort_by(ResolvedRecord::emission_order);
        debug!(records = batch.len(), "releasing sorted batch");
        batch.into_iter().map(EmittedRecord::from).collect()
    }
}
