//! Schedulers used by `subscribe_on`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{trace, warn};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks somewhere, possibly on another thread.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, task: Task);

    fn name(&self) -> &str;
}

/// Runs every task inline on the calling thread.
#[derive(Debug, Default)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn schedule(&self, task: Task) {
        task();
    }

    fn name(&self) -> &str {
        "immediate"
    }
}

/// Spawns a named thread per task.
#[derive(Debug)]
pub struct NewThread {
    prefix: String,
    spawned: AtomicUsize,
}

impl NewThread {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            spawned: AtomicUsize::new(0),
        }
    }
}

impl Default for NewThread {
    fn default() -> Self {
        Self::new("rx-new-thread")
    }
}

impl Scheduler for NewThread {
    fn schedule(&self, task: Task) {
        let seq = self.spawned.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.prefix, seq);
        trace!(thread = %name, "Scheduling task on new thread");

        // The task comes back only if spawning failed; run it here rather than lose it.
        let pending = Arc::new(parking_lot::Mutex::new(Some(task)));
        let handoff = pending.clone();
        let spawned = std::thread::Builder::new().name(name.clone()).spawn(move || {
            if let Some(task) = handoff.lock().take() {
                task();
            }
        });
        if let Err(err) = spawned {
            warn!(thread = %name, error = %err, "Failed to spawn scheduler thread; running inline");
            if let Some(task) = pending.lock().take() {
                task();
            }
        }
    }

    fn name(&self) -> &str {
        &self.prefix
    }
}

pub fn immediate() -> Arc<dyn Scheduler> {
    Arc::new(Immediate)
}

pub fn new_thread() -> Arc<dyn Scheduler> {
    Arc::new(NewThread::default())
}
