use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

/// A counting semaphore built on a mutex and condition variable.
///
/// Once closed, `wait` returns immediately and `post` does nothing.
#[derive(Debug, Default)]
pub(crate) struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
    closed: AtomicBool,
}

impl Semaphore {
    /// Blocks until the count is positive, then decrements it. Returns at
    /// once, leaving the count alone, if the semaphore is closed.
    pub(crate) fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.closed.load(Ordering::Acquire) {
                return;
            }
            if *count > 0 {
                *count -= 1;
                return;
            }
            count = self.cond.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Increments the count and wakes one waiter.
    pub(crate) fn post(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        self.cond.notify_one();
    }

    /// Marks the semaphore dead and releases every waiter.
    pub(crate) fn close(&self) {
        // Taken under the lock so a waiter cannot miss the wakeup between
        // its flag check and its wait.
        let _count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        self.closed.store(true, Ordering::Release);
        self.cond.notify_all();
    }
}
