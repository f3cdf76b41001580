//! Pipeline read-loop core: drives a data source to completion inside a
//! worker while exposing a non-blocking bounded-staleness progress view and
//! accepting live requests to shrink the remaining work range.

pub mod config;
pub mod read;
pub mod receiver;
pub mod sampler;
pub mod source;
pub mod telemetry;

pub use config::{ConfigError, ReadConfig, DEFAULT_PROGRESS_REFRESH_PERIOD_MS};
pub use read::cell::ProgressCell;
pub use read::operation::{LifecycleState, ReadError, ReadOperation};
pub use read::ticker::RefreshTicker;
pub use receiver::{BoundedQueueReceiver, Receiver, ReceiverError};
pub use sampler::{ScopedState, StateId, StateSampler};
pub use source::memory::{InMemorySource, RecordIndexPosition, RecordIndexProgress};
pub use source::{Progress, SharedProgress, Source, SourceError, SourceIterator, StopPosition};
pub use telemetry::{
    bytes_counter_name, AggregationKind, ByteObserver, Counter, CounterSet, CounterSnapshot,
    TelemetryError,
};
