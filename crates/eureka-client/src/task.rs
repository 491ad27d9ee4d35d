use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::Instrument;

/// Slot for one self-rescheduling loop.
///
/// Every (re)start bumps the generation. A run only reschedules itself while its
/// generation is still current, so a stopped or superseded run dies out on its own
/// and at most one delayed tick is ever pending.
#[derive(Debug, Default)]
pub struct TaskSlot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl TaskSlot {
    /// Cancels the pending tick and opens a new generation.
    pub fn restart(&mut self) -> u64 {
        self.cancel_pending();
        self.generation += 1;
        self.generation
    }

    /// Cancels the pending tick and invalidates any run in flight.
    pub fn stop(&mut self) {
        self.cancel_pending();
        self.generation += 1;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Called by a tick as it fires. Returns false when the tick went stale while it slept.
    pub fn claim(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        // The pending handle is the firing task itself; detach rather than abort it.
        self.pending.take();
        true
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Runs `tick` after `delay` unless the slot moved on to another generation.
    pub fn schedule<F>(&mut self, generation: u64, delay: Duration, span: &tracing::Span, tick: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.is_current(generation) {
            return false;
        }
        self.cancel_pending();
        self.pending = Some(tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;
                tick.await;
            }
            .instrument(span.clone()),
        ));
        true
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
