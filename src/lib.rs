#![deny(missing_docs)]

//! A worker pool library with typed one-shot results.
//!
//! Tasks of any output type are submitted to a [`ThreadPool`] running a
//! bounded set of worker threads. Each submission yields a [`TaskResult`]
//! through which the task's value is later retrieved. The pool can run a
//! fixed number of workers or grow under load and shrink when idle, applies
//! backpressure when its queue is full, and drains queued work on drop.

mod any;
mod config;
mod error;
mod result;
mod semaphore;
mod task;
/// The worker pool and its state.
pub mod thread_pool;

pub use any::AnyValue;
pub use config::{PoolConfig, PoolMode, TASK_QUEUE_CAPACITY, THREAD_CEILING};
pub use error::{PoolError, Result};
pub use result::TaskResult;
pub use task::{FnTask, Task};
pub use thread_pool::{PoolState, PoolStats, ThreadPool};
