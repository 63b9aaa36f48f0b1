//! Single-slot cancellable timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::mutex_lock;

const SOURCE: &str = "query::timer";

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<Pending>,
}

/// Debounce timer with exactly one pending action.
///
/// Scheduling aborts the previous timer, so only the last action in a burst
/// runs. Outside a tokio runtime the action runs immediately.
pub struct Debouncer {
    delay: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime for debounce timer; running action now");
            self.cancel();
            action();
            return;
        };

        let mut slot = mutex_lock(&self.slot, SOURCE, "schedule");
        if let Some(previous) = slot.pending.take() {
            previous.handle.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;

        let delay = self.delay;
        let shared = Arc::clone(&self.slot);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = mutex_lock(&shared, SOURCE, "fire");
                if slot
                    .pending
                    .as_ref()
                    .is_none_or(|pending| pending.generation != generation)
                {
                    return;
                }
                slot.pending = None;
            }
            action();
        });
        slot.pending = Some(Pending { generation, handle });
    }

    /// Drop the pending action. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut slot = mutex_lock(&self.slot, SOURCE, "cancel");
        match slot.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        mutex_lock(&self.slot, SOURCE, "is_pending")
            .pending
            .is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
