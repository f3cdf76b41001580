use crate::source::SharedProgress;
use std::sync::Mutex;

/// Single-slot cache of the most recent progress snapshot.
///
/// The read loop overwrites the slot at a bounded rate from inside its
/// iterator lock; any number of pollers read it at any time. Both sides only
/// move an `Arc` pointer under the slot lock, so a reader is never made to
/// wait on iterator work or I/O. Empty until the loop's first refresh.
#[derive(Debug, Default)]
pub struct ProgressCell {
    slot: Mutex<Option<SharedProgress>>,
}

impl ProgressCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, progress: SharedProgress) {
        *self.slot.lock().unwrap() = Some(progress);
    }

    pub fn load(&self) -> Option<SharedProgress> {
        self.slot.lock().unwrap().clone()
    }
}
