//! Counting semaphore used for producer backpressure.
//!
//! The ring gates every send on one permit from this semaphore, so a
//! producer facing a full ring parks here instead of spinning. `std` has no
//! counting semaphore, so this is the usual mutex-plus-condvar rendition.
//! It only runs when a producer must block or a consumer frees a slot; the
//! channel's fast path never touches it beyond one uncontended lock.

use crate::fatal::fatal;
use std::sync::{Condvar, Mutex, MutexGuard};

pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    freed: Condvar,
}

impl Semaphore {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            freed: Condvar::new(),
        }
    }

    /// Takes one permit, blocking until one is available.
    pub(crate) fn acquire(&self) {
        let mut permits = self.lock();
        while *permits == 0 {
            permits = self
                .freed
                .wait(permits)
                .unwrap_or_else(|_| fatal!("semaphore wait on poisoned mutex"));
        }
        *permits -= 1;
    }

    /// Returns one permit, waking a single blocked `acquire` if any.
    pub(crate) fn release(&self) {
        let mut permits = self.lock();
        *permits += 1;
        self.freed.notify_one();
    }

    /// Current permit count. Only meaningful when no thread can be
    /// concurrently acquiring or releasing (used by the ring's teardown
    /// accounting check).
    pub(crate) fn available(&self) -> usize {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // A poisoned mutex means a thread panicked while holding it. The
        // critical sections here are two arithmetic ops, so that implies
        // state we cannot reason about.
        self.permits
            .lock()
            .unwrap_or_else(|_| fatal!("semaphore mutex poisoned"))
    }
}
