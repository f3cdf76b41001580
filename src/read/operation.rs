use crate::config::ReadConfig;
use crate::read::cell::ProgressCell;
use crate::read::ticker::RefreshTicker;
use crate::receiver::{Receiver, ReceiverError};
use crate::sampler::{StateId, StateSampler};
use crate::source::{Progress, SharedProgress, Source, SourceError, SourceIterator, StopPosition};
use crate::telemetry::{
    bytes_counter_name, AggregationKind, ByteObserver, Counter, CounterSet, TelemetryError,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// Named lifecycle states exposed for instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Closed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::NotStarted => "not_started",
            LifecycleState::Running => "running",
            LifecycleState::Succeeded => "succeeded",
            LifecycleState::Failed => "failed",
            LifecycleState::Closed => "closed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error surfaced by a read-loop execution. Cleanup (iterator close, ticker
/// join) has already run by the time one of these reaches the caller.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open source iterator")]
    Open {
        #[source]
        source: SourceError,
    },
    #[error("source iteration failed")]
    Iteration {
        #[source]
        source: SourceError,
    },
    #[error("downstream forwarding failed")]
    Forward {
        #[source]
        source: ReceiverError,
    },
    #[error("read loop cancelled")]
    Cancelled,
}

type SharedIterator<T> = Arc<Mutex<Option<Box<dyn SourceIterator<T>>>>>;

/// The read operation: drives a source to completion inside a pipeline
/// worker, forwarding elements to the first downstream receiver while
/// exposing a cheap bounded-staleness progress view and accepting live
/// requests to shrink the remaining work range.
///
/// The iterator lives behind a single mutex and is the sole point of truth
/// for both progress and splitting. The lock is acquired and released per
/// record and never held across forwarding, so progress polls and split
/// proposals from other threads are serviced between records.
pub struct ReadOperation<T> {
    name: String,
    source: Arc<dyn Source<T>>,
    receivers: Mutex<Vec<Box<dyn Receiver<T>>>>,
    config: ReadConfig,
    byte_counter: Arc<Counter>,
    sampler: Arc<StateSampler>,
    start_state: StateId,
    process_state: StateId,
    read_state: StateId,
    iterator: SharedIterator<T>,
    progress: ProgressCell,
    refresh_requested: Arc<AtomicBool>,
    cancelled: AtomicBool,
    state: Mutex<LifecycleState>,
}

impl<T> ReadOperation<T>
where
    T: Send + 'static,
{
    /// Wires an operation to its source, receivers, counter set, and state
    /// sampler. Registers the `{name}-ByteCount` sum counter and the
    /// `start`/`process`/`read` instrumentation states.
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn Source<T>>,
        receivers: Vec<Box<dyn Receiver<T>>>,
        config: ReadConfig,
        counters: &CounterSet,
        sampler: Arc<StateSampler>,
    ) -> Result<Self, TelemetryError> {
        let name = name.into();
        let byte_counter = counters.add_counter(bytes_counter_name(&name), AggregationKind::Sum)?;
        let start_state = sampler.state_for_name(&format!("{name}-start"));
        let process_state = sampler.state_for_name(&format!("{name}-process"));
        let read_state = sampler.state_for_name(&format!("{name}-read"));
        Ok(Self {
            name,
            source,
            receivers: Mutex::new(receivers),
            config,
            byte_counter,
            sampler,
            start_state,
            process_state,
            read_state,
            iterator: Arc::new(Mutex::new(None)),
            progress: ProgressCell::new(),
            refresh_requested: Arc::new(AtomicBool::new(true)),
            cancelled: AtomicBool::new(false),
            state: Mutex::new(LifecycleState::NotStarted),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap()
    }

    /// Running total of bytes read, as reported by the source.
    pub fn bytes_read(&self) -> u64 {
        self.byte_counter.value()
    }

    pub fn byte_counter(&self) -> &Arc<Counter> {
        &self.byte_counter
    }

    /// Runs the read loop to completion on the calling thread.
    pub fn start(&self) -> Result<(), ReadError> {
        let _start = self.sampler.scoped(self.start_state);
        let mut receivers = self.receivers.lock().unwrap();
        let Some(receiver) = receivers.first_mut() else {
            // No consumer of this data; reading it would be wasted work.
            debug!(operation = %self.name, "no downstream receiver, skipping read");
            self.set_state(LifecycleState::Closed);
            return Ok(());
        };
        self.set_state(LifecycleState::Running);
        let result = self.run_read_loop(receiver.as_mut());
        self.set_state(match result {
            Ok(()) => LifecycleState::Succeeded,
            Err(_) => LifecycleState::Failed,
        });
        self.set_state(LifecycleState::Closed);
        result
    }

    /// Possibly slightly stale view of the loop's progress. Never blocks and
    /// never touches the iterator; empty before the loop's first refresh,
    /// stable terminal snapshot after completion.
    pub fn progress(&self) -> Option<SharedProgress> {
        self.progress.load()
    }

    /// Relays a stop-position proposal to the live iterator. Returns `None`
    /// when the iterator does not exist (yet, or any more): concurrent
    /// callers cannot know the operation's exact start time, so that is a
    /// logged non-event rather than an error.
    pub fn propose_stop_position(&self, proposed: &dyn Progress) -> Option<Box<dyn StopPosition>> {
        let mut slot = self.iterator.lock().unwrap();
        match slot.as_mut() {
            Some(iterator) => iterator.update_stop_position(proposed),
            None => {
                warn!(operation = %self.name, "stop position proposed while no source iterator exists");
                None
            }
        }
    }

    /// Requests cancellation. The loop observes the flag at its next
    /// iteration boundary and fails with [`ReadError::Cancelled`] after the
    /// usual cleanup.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn run_read_loop(&self, receiver: &mut dyn Receiver<T>) -> Result<(), ReadError> {
        let _process = self.sampler.scoped(self.process_state);
        {
            let mut slot = self.iterator.lock().unwrap();
            let observer = ByteObserver::new(Arc::clone(&self.byte_counter));
            *slot = Some(
                self.source
                    .open(observer)
                    .map_err(|source| ReadError::Open { source })?,
            );
        }
        let ticker = if self.config.refresh_every_record() {
            None
        } else {
            Some(RefreshTicker::start(
                self.config.refresh_period(),
                Arc::clone(&self.refresh_requested),
            ))
        };

        let result = self.pump(receiver);

        // Guaranteed cleanup on every exit path: release the source's
        // resources first, then take down the ticker. A close failure is
        // logged so it never masks the loop's own result.
        {
            let mut slot = self.iterator.lock().unwrap();
            if let Some(mut iterator) = slot.take() {
                if let Err(error) = iterator.close() {
                    warn!(operation = %self.name, %error, "source iterator close failed");
                }
            }
        }
        if let Some(ticker) = ticker {
            ticker.stop();
        }
        result
    }

    fn pump(&self, receiver: &mut dyn Receiver<T>) -> Result<(), ReadError> {
        // Forced refresh before the first element so a poller arriving right
        // after start sees a real snapshot instead of empty.
        self.refresh_progress();
        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(ReadError::Cancelled);
            }
            let value = {
                let _read = self.sampler.scoped(self.read_state);
                let mut slot = self.iterator.lock().unwrap();
                let iterator = slot
                    .as_mut()
                    .expect("iterator installed for the duration of the read loop");
                if !iterator
                    .has_next()
                    .map_err(|source| ReadError::Iteration { source })?
                {
                    break;
                }
                let value = iterator
                    .next()
                    .map_err(|source| ReadError::Iteration { source })?;
                if self.refresh_requested.swap(false, Ordering::Relaxed)
                    || self.config.refresh_every_record()
                {
                    if let Some(snapshot) = iterator.progress() {
                        self.progress.store(snapshot);
                    }
                }
                value
            };
            // Forward outside the iterator lock: process() may block on
            // downstream backpressure, and progress polls and split proposals
            // must not wait out a record's forwarding time.
            receiver
                .process(value)
                .map_err(|source| ReadError::Forward { source })?;
        }
        // Terminal refresh so post-completion pollers see the exhausted
        // position rather than the last periodic snapshot.
        self.refresh_progress();
        Ok(())
    }

    fn refresh_progress(&self) {
        let mut slot = self.iterator.lock().unwrap();
        let iterator = slot
            .as_mut()
            .expect("iterator installed for the duration of the read loop");
        if let Some(snapshot) = iterator.progress() {
            self.progress.store(snapshot);
        }
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.lock().unwrap();
        debug!(operation = %self.name, from = %*state, to = %next, "lifecycle transition");
        *state = next;
    }
}
