use super::{Progress, SharedProgress, Source, SourceError, SourceIterator, StopPosition};
use crate::telemetry::ByteObserver;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;

/// Progress expressed as records consumed out of a known total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordIndexProgress {
    pub records_consumed: usize,
    pub total_records: usize,
}

impl Progress for RecordIndexProgress {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn fraction_consumed(&self) -> Option<f64> {
        if self.total_records == 0 {
            Some(1.0)
        } else {
            Some(self.records_consumed as f64 / self.total_records as f64)
        }
    }
}

/// Exclusive record-index boundary: reading stops before this index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordIndexPosition {
    pub record_index: usize,
}

impl StopPosition for RecordIndexPosition {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Source over an in-memory record list. The reference implementation for the
/// iterator contract; also the cheapest way to feed a read operation in tests
/// and small bounded reads.
pub struct InMemorySource<T> {
    records: Arc<Vec<T>>,
    encoded_size: fn(&T) -> u64,
}

impl<T> InMemorySource<T>
where
    T: Clone + Send + Sync,
{
    /// Builds a source over `records`. `encoded_size` supplies the byte size
    /// reported for each record, since in-memory records have no serialized
    /// form of their own.
    pub fn new(records: Vec<T>, encoded_size: fn(&T) -> u64) -> Self {
        Self {
            records: Arc::new(records),
            encoded_size,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T> Source<T> for InMemorySource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn open(&self, bytes: ByteObserver) -> Result<Box<dyn SourceIterator<T>>, SourceError> {
        Ok(Box::new(InMemoryIterator {
            records: Arc::clone(&self.records),
            encoded_size: self.encoded_size,
            bytes,
            cursor: 0,
            stop_index: self.records.len(),
            closed: false,
        }))
    }
}

struct InMemoryIterator<T> {
    records: Arc<Vec<T>>,
    encoded_size: fn(&T) -> u64,
    bytes: ByteObserver,
    cursor: usize,
    stop_index: usize,
    closed: bool,
}

impl<T> SourceIterator<T> for InMemoryIterator<T>
where
    T: Clone + Send + Sync,
{
    fn has_next(&mut self) -> Result<bool, SourceError> {
        if self.closed {
            return Err(SourceError::IteratorClosed);
        }
        Ok(self.cursor < self.stop_index)
    }

    fn next(&mut self) -> Result<T, SourceError> {
        if self.closed {
            return Err(SourceError::IteratorClosed);
        }
        if self.cursor >= self.stop_index {
            return Err(SourceError::Exhausted);
        }
        let record = self.records[self.cursor].clone();
        self.bytes.record_bytes((self.encoded_size)(&record));
        self.cursor += 1;
        Ok(record)
    }

    fn progress(&self) -> Option<SharedProgress> {
        Some(Arc::new(RecordIndexProgress {
            records_consumed: self.cursor,
            total_records: self.records.len(),
        }))
    }

    fn update_stop_position(&mut self, proposed: &dyn Progress) -> Option<Box<dyn StopPosition>> {
        if self.closed {
            return None;
        }
        let proposed = proposed.as_any().downcast_ref::<RecordIndexProgress>()?;
        let boundary = proposed.records_consumed;
        if boundary <= self.cursor {
            // Would exclude a record already produced (or mid-flight).
            return None;
        }
        if boundary >= self.stop_index {
            // Does not shrink the remaining range.
            return None;
        }
        self.stop_index = boundary;
        Some(Box::new(RecordIndexPosition {
            record_index: boundary,
        }))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        if self.closed {
            return Err(SourceError::IteratorClosed);
        }
        self.closed = true;
        Ok(())
    }
}
