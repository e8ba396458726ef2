//! Batch accumulation

use crate::record::Record;

/// Ordered, bounded buffer of records for one job
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: usize,
    records: Vec<Record>,
}

impl BatchAccumulator {
    /// `capacity` is clamped to at least one record
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Vec::with_capacity(capacity.min(10_000)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record; returns true when the batch is now full and must be flushed
    pub fn push(&mut self, record: Record) -> bool {
        debug_assert!(!self.is_full(), "push into a full batch");
        self.records.push(record);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Drop the buffered records, keeping the allocation
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
