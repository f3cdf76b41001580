use crossbeam_queue::ArrayQueue;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error raised by a downstream receiver. Fatal to the read loop that was
/// forwarding to it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReceiverError {
    #[error("downstream queue still full after {waited_ms} ms (capacity {capacity})")]
    Full { capacity: usize, waited_ms: u64 },
    #[error("downstream receiver closed")]
    Closed,
}

/// Downstream consumer of one element at a time.
pub trait Receiver<T>: Send {
    fn process(&mut self, value: T) -> Result<(), ReceiverError>;
}

impl<T, F> Receiver<T> for F
where
    T: Send,
    F: FnMut(T) -> Result<(), ReceiverError> + Send,
{
    fn process(&mut self, value: T) -> Result<(), ReceiverError> {
        self(value)
    }
}

/// Bounded FIFO sink shared with a consumer thread. `process` waits out
/// transient backpressure with short parked sleeps and gives up with
/// [`ReceiverError::Full`] once `patience` is exhausted.
pub struct BoundedQueueReceiver<T> {
    queue: Arc<ArrayQueue<T>>,
    patience: Duration,
}

impl<T> BoundedQueueReceiver<T> {
    pub fn new(capacity: usize, patience: Duration) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity)),
            patience,
        }
    }

    /// Handle for the consuming side.
    pub fn queue(&self) -> Arc<ArrayQueue<T>> {
        Arc::clone(&self.queue)
    }
}

impl<T: Send> Receiver<T> for BoundedQueueReceiver<T> {
    fn process(&mut self, value: T) -> Result<(), ReceiverError> {
        let deadline = Instant::now() + self.patience;
        let mut pending = value;
        loop {
            match self.queue.push(pending) {
                Ok(()) => return Ok(()),
                Err(rejected) => {
                    if Instant::now() >= deadline {
                        return Err(ReceiverError::Full {
                            capacity: self.queue.capacity(),
                            waited_ms: self.patience.as_millis() as u64,
                        });
                    }
                    pending = rejected;
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }
}
