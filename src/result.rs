use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use crate::any::AnyValue;
use crate::semaphore::Semaphore;
use crate::task::Job;
use crate::{PoolError, Result};

/// Storage a job writes its value into.
#[derive(Default)]
pub(crate) struct Slot {
    value: Mutex<AnyValue>,
    ready: Semaphore,
}

impl Slot {
    pub(crate) fn fulfill(&self, value: AnyValue) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
        self.ready.post();
    }

    fn take(&self) -> AnyValue {
        std::mem::take(&mut *self.value.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// A one-shot handle to the value of a submitted task.
///
/// A result is *invalid* when the pool rejected the submission; its
/// [`get`](TaskResult::get) returns an empty value without blocking.
pub struct TaskResult {
    slot: Arc<Slot>,
    _job: Arc<Job>,
    valid: bool,
}

impl TaskResult {
    /// Creates a valid result and binds `job` to it.
    pub(crate) fn bound_to(job: Arc<Job>) -> Self {
        let slot = Arc::new(Slot::default());
        job.bind(&slot);
        TaskResult {
            slot,
            _job: job,
            valid: true,
        }
    }

    /// Marks the submission as rejected.
    pub(crate) fn reject(&mut self) {
        self.valid = false;
        self.slot.ready.close();
    }

    /// Returns `false` if the submission was rejected.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Blocks until the task has run, then takes its value.
    ///
    /// The value can be taken once; later calls return an empty value
    /// without blocking. Invalid results return an empty value immediately.
    pub fn get(&self) -> AnyValue {
        if !self.valid {
            return AnyValue::empty();
        }
        self.slot.ready.wait();
        // Later waits must not block on a post that will never come.
        self.slot.ready.close();
        self.slot.take()
    }

    /// Blocks for the value and extracts it as a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Rejected`] for an invalid result and
    /// [`PoolError::TypeMismatch`] if the task produced something other
    /// than a `T`.
    pub fn get_as<T: Any>(&self) -> Result<T> {
        if !self.valid {
            return Err(PoolError::Rejected);
        }
        self.get().cast()
    }
}
