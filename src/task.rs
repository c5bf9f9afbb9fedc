use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use log::error;

use crate::any::AnyValue;
use crate::result::Slot;

/// A unit of work that can be submitted to a [`ThreadPool`](crate::ThreadPool).
///
/// Implementors return their output boxed in an [`AnyValue`] so a single
/// pool can run tasks with different output types.
pub trait Task: Send + Sync {
    /// Runs the task and produces its value.
    fn run(&self) -> AnyValue;
}

impl<F> Task for F
where
    F: Fn() -> AnyValue + Send + Sync,
{
    fn run(&self) -> AnyValue {
        self()
    }
}

/// Adapts a one-shot closure into a [`Task`].
///
/// Running it a second time yields an empty value.
pub struct FnTask<F> {
    f: Mutex<Option<F>>,
}

impl<F, R> FnTask<F>
where
    F: FnOnce() -> R + Send,
    R: Any + Send,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        FnTask {
            f: Mutex::new(Some(f)),
        }
    }
}

impl<F, R> Task for FnTask<F>
where
    F: FnOnce() -> R + Send,
    R: Any + Send,
{
    fn run(&self) -> AnyValue {
        let f = self.f.lock().unwrap_or_else(PoisonError::into_inner).take();
        f.map_or_else(AnyValue::empty, |f| AnyValue::new(f()))
    }
}

/// A submitted task together with its (non-owning) link to a result slot.
///
/// Shared between the queue and the caller's `TaskResult`, so it lives until
/// both are done with it.
pub(crate) struct Job {
    task: Box<dyn Task>,
    slot: OnceLock<Weak<Slot>>,
}

impl Job {
    pub(crate) fn new(task: Box<dyn Task>) -> Arc<Job> {
        Arc::new(Job {
            task,
            slot: OnceLock::new(),
        })
    }

    /// Links the job to the slot that receives its value. Only the first
    /// binding takes effect.
    pub(crate) fn bind(&self, slot: &Arc<Slot>) {
        let _ = self.slot.set(Arc::downgrade(slot));
    }

    /// Runs the task and delivers its value to the bound slot, if the slot
    /// still exists. A panicking task delivers an empty value.
    pub(crate) fn execute(&self) {
        let value = match panic::catch_unwind(AssertUnwindSafe(|| self.task.run())) {
            Ok(value) => value,
            Err(_) => {
                error!("Task panicked, delivering an empty value");
                AnyValue::empty()
            }
        };
        if let Some(slot) = self.slot.get().and_then(Weak::upgrade) {
            slot.fulfill(value);
        }
    }
}
