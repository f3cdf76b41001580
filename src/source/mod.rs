pub mod memory;

use crate::telemetry::ByteObserver;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Opaque snapshot of how far through a source the read cursor is. The read
/// loop caches and returns these without interpreting them; only the source
/// that produced a snapshot knows its coordinate system.
pub trait Progress: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Fraction of the source consumed, when the source can compute one.
    fn fraction_consumed(&self) -> Option<f64> {
        None
    }
}

/// Most-recent-snapshot handle shared between the read loop and pollers.
pub type SharedProgress = Arc<dyn Progress>;

/// Opaque stop boundary accepted during work rebalancing.
pub trait StopPosition: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Error raised by a source or its iterator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source I/O failure")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("iterator advanced past the end of the source")]
    Exhausted,
    #[error("iterator used after close")]
    IteratorClosed,
    #[error("corrupt record: {detail}")]
    Corrupt { detail: String },
}

/// Live read cursor over a source. All mutating calls happen under the read
/// operation's iterator lock; implementations never see interleaved calls.
pub trait SourceIterator<T>: Send {
    /// Side-effect-free peek. `false` is the only normal terminal signal.
    fn has_next(&mut self) -> Result<bool, SourceError>;

    /// Advances the cursor by exactly one record. Errors after exhaustion or
    /// close. Reports the record's encoded size to the observer handed to
    /// [`Source::open`] as a side effect.
    fn next(&mut self) -> Result<T, SourceError>;

    /// Snapshot consistent with the cursor at the moment of the call. Must
    /// not initiate blocking I/O beyond what is already in flight.
    fn progress(&self) -> Option<SharedProgress>;

    /// Negotiates a new upper bound for the remaining range. The source may
    /// accept the proposal, snap it to the nearest valid boundary, or refuse
    /// (`None`) when the cursor has already reached the proposed point, the
    /// proposal does not shrink the range, or the proposal cannot be decoded.
    fn update_stop_position(&mut self, proposed: &dyn Progress) -> Option<Box<dyn StopPosition>>;

    /// Releases the backing resource. The read loop calls this exactly once.
    fn close(&mut self) -> Result<(), SourceError>;
}

/// Immutable description of a data origin able to produce a read cursor.
pub trait Source<T>: Send + Sync {
    /// Binds a fresh cursor and hands it the byte-accounting callback. Open
    /// failure aborts the read loop before any element is produced.
    fn open(&self, bytes: ByteObserver) -> Result<Box<dyn SourceIterator<T>>, SourceError>;
}
