use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// Slot 0 of the current-state word means "no state active"; registered states
// occupy 1.. so the word stays a single atomic usize.
const NO_STATE: usize = 0;

/// Dense handle for a registered instrumentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateId(usize);

/// Registry of named instrumentation states with a sampled current-state word.
///
/// The executing thread enters states through [`StateSampler::scoped`]; any
/// other thread may call [`StateSampler::current_state_name`] at any time to
/// sample which phase is active without blocking the executor.
#[derive(Debug)]
pub struct StateSampler {
    prefix: String,
    names: Mutex<Vec<String>>,
    current: AtomicUsize,
}

impl StateSampler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            names: Mutex::new(Vec::new()),
            current: AtomicUsize::new(NO_STATE),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers `name` under the sampler prefix. Registering the same name
    /// twice returns the existing id.
    pub fn state_for_name(&self, name: &str) -> StateId {
        let full = format!("{}-{}", self.prefix, name);
        let mut names = self.names.lock().unwrap();
        if let Some(index) = names.iter().position(|existing| existing == &full) {
            return StateId(index + 1);
        }
        names.push(full);
        StateId(names.len())
    }

    /// Enters `state`, returning a guard that restores the previously active
    /// state when dropped. The restore runs on every exit path, including
    /// panics and early error returns, so no state is ever left open.
    pub fn scoped(&self, state: StateId) -> ScopedState<'_> {
        let previous = self.current.swap(state.0, Ordering::SeqCst);
        ScopedState {
            sampler: self,
            previous,
        }
    }

    /// Name of the currently active state, if any.
    pub fn current_state_name(&self) -> Option<String> {
        match self.current.load(Ordering::SeqCst) {
            NO_STATE => None,
            slot => self.names.lock().unwrap().get(slot - 1).cloned(),
        }
    }
}

/// RAII guard for one entered instrumentation state.
#[derive(Debug)]
pub struct ScopedState<'a> {
    sampler: &'a StateSampler,
    previous: usize,
}

impl Drop for ScopedState<'_> {
    fn drop(&mut self) {
        self.sampler.current.store(self.previous, Ordering::SeqCst);
    }
}
