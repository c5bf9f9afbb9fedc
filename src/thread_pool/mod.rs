/// Lifecycle state of a [`ThreadPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Not started, or fully drained. Configuration may change.
    Stopped,
    /// Workers are running and submissions are accepted.
    Running,
    /// Shutdown has begun; workers finish queued tasks and exit.
    ///
    /// Only workers see this state: [`ThreadPool::shutdown`] holds the pool
    /// exclusively until draining ends, so [`ThreadPool::state`] reports
    /// `Running` before it and `Stopped` after it.
    Draining,
}

/// Counters describing a pool at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Workers currently registered.
    pub live_workers: usize,
    /// Live workers not running a task.
    pub idle_workers: usize,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Workers created since the pool was built.
    pub spawned: usize,
    /// Workers that have exited since the pool was built.
    pub retired: usize,
    /// Highest live worker count observed.
    pub peak_workers: usize,
}

mod pool;
mod worker;

pub use self::pool::ThreadPool;
