use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Aggregation contract attached to a counter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Sum,
    Max,
}

impl AggregationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationKind::Sum => "sum",
            AggregationKind::Max => "max",
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised while registering counters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("counter '{name}' already registered as {existing}, requested {requested}")]
    KindMismatch {
        name: String,
        existing: AggregationKind,
        requested: AggregationKind,
    },
}

/// Named monotonic counter. Increments are relaxed atomic adds, so a counter
/// may be shared across operations without extra locking.
#[derive(Debug)]
pub struct Counter {
    name: String,
    kind: AggregationKind,
    value: AtomicU64,
}

impl Counter {
    fn new(name: String, kind: AggregationKind) -> Self {
        Self {
            name,
            kind,
            value: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AggregationKind {
        self.kind
    }

    /// Folds `delta` into the counter according to its aggregation kind.
    /// Never decreases the stored value.
    pub fn add(&self, delta: u64) {
        match self.kind {
            AggregationKind::Sum => {
                self.value.fetch_add(delta, Ordering::Relaxed);
            }
            AggregationKind::Max => {
                self.value.fetch_max(delta, Ordering::Relaxed);
            }
        }
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            name: self.name.clone(),
            kind: self.kind,
            value: self.value(),
        }
    }
}

/// Point-in-time counter value exported to scrapers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub name: String,
    pub kind: AggregationKind,
    pub value: u64,
}

/// Registry of named counters shared by the operations of one worker.
#[derive(Debug, Default)]
pub struct CounterSet {
    counters: Mutex<BTreeMap<String, Arc<Counter>>>,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a counter, reusing an existing one registered under the same
    /// name. Re-registering a name with a different aggregation kind is a
    /// wiring bug and is rejected.
    pub fn add_counter(
        &self,
        name: impl Into<String>,
        kind: AggregationKind,
    ) -> Result<Arc<Counter>, TelemetryError> {
        let name = name.into();
        let mut counters = self.counters.lock().unwrap();
        if let Some(existing) = counters.get(&name) {
            if existing.kind() != kind {
                return Err(TelemetryError::KindMismatch {
                    name,
                    existing: existing.kind(),
                    requested: kind,
                });
            }
            return Ok(Arc::clone(existing));
        }
        let counter = Arc::new(Counter::new(name.clone(), kind));
        counters.insert(name, Arc::clone(&counter));
        Ok(counter)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Counter>> {
        self.counters.lock().unwrap().get(name).cloned()
    }

    pub fn snapshot(&self) -> Vec<CounterSnapshot> {
        self.counters
            .lock()
            .unwrap()
            .values()
            .map(|counter| counter.snapshot())
            .collect()
    }
}

/// Byte-accounting callback a read operation hands to `Source::open`. The
/// iterator invokes it once per produced element with the element's encoded
/// size, keeping byte accounting off the value path.
#[derive(Debug, Clone)]
pub struct ByteObserver {
    counter: Arc<Counter>,
}

impl ByteObserver {
    pub fn new(counter: Arc<Counter>) -> Self {
        Self { counter }
    }

    pub fn record_bytes(&self, bytes: u64) {
        self.counter.add(bytes);
    }

    pub fn counter(&self) -> &Arc<Counter> {
        &self.counter
    }
}

/// Canonical name of an operation's byte counter.
pub fn bytes_counter_name(operation_name: &str) -> String {
    format!("{operation_name}-ByteCount")
}
