use std::future::Future;

use tokio::task::JoinHandle;

/// Owner of at most one background timer task.
///
/// Arming always aborts the previous task first. Every arm gets a new
/// generation number that the task reports back with its signal, so a signal
/// from a task that was cancelled after it already fired is recognised as
/// stale and dropped.
#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl TimerSlot {
    /// Cancel the current task and spawn `make(generation)` in its place.
    pub(crate) fn arm<F, Fut>(&mut self, make: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        self.handle = Some(tokio::spawn(make(self.generation)));
        self.generation
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether `generation` belongs to the task that is currently armed.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    /// Consume the signal of a one-shot timer. Returns `false` for stale signals.
    pub(crate) fn fired(&mut self, generation: u64) -> bool {
        let current = self.is_current(generation);
        if current {
            self.handle = None;
        }
        current
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
