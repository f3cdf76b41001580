use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct TickerShared {
    stopped: Mutex<bool>,
    cv: Condvar,
}

/// Background timer that raises the shared refresh flag once per period.
///
/// The ticker only communicates intent: it never touches the iterator or the
/// progress cache. Sleeping happens on a condvar so [`RefreshTicker::stop`]
/// wakes, stops, and joins the thread immediately instead of waiting out the
/// period. `Drop` also stops it, so no ticker outlives its read loop.
pub struct RefreshTicker {
    shared: Arc<TickerShared>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshTicker {
    pub fn start(period: Duration, refresh_requested: Arc<AtomicBool>) -> Self {
        let shared = Arc::new(TickerShared {
            stopped: Mutex::new(false),
            cv: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name("progress-ticker".to_string())
            .spawn(move || {
                let mut stopped = thread_shared.stopped.lock().unwrap();
                while !*stopped {
                    refresh_requested.store(true, Ordering::Relaxed);
                    let (guard, _timeout) = thread_shared.cv.wait_timeout(stopped, period).unwrap();
                    stopped = guard;
                }
            })
            .expect("failed to spawn progress ticker");
        Self {
            shared,
            join: Mutex::new(Some(join)),
        }
    }

    /// Stops the ticker and joins its thread. Idempotent.
    pub fn stop(&self) {
        {
            let mut stopped = self.shared.stopped.lock().unwrap();
            *stopped = true;
            self.shared.cv.notify_all();
        }
        if let Some(handle) = self.join.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RefreshTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
