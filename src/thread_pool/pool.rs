use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{debug, warn};

use super::worker::{Worker, WorkerIds};
use super::{PoolState, PoolStats};
use crate::config::{PoolConfig, PoolMode};
use crate::result::TaskResult;
use crate::task::{FnTask, Job, Task};
use crate::{PoolError, Result};

/// A pool of worker threads executing submitted [`Task`]s.
///
/// The pool is created stopped; configure it, then call
/// [`start`](ThreadPool::start). Dropping the pool drains it: queued tasks
/// still run, and the drop returns once every worker has exited.
///
/// ```no_run
/// use taskpool::{AnyValue, ThreadPool};
///
/// let pool = ThreadPool::new();
/// pool.start(4).unwrap();
/// let result = pool.submit(|| AnyValue::new(6 * 7));
/// assert_eq!(result.get_as::<i32>().unwrap(), 42);
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
}

/// State shared between the pool handle and its workers.
struct Shared {
    state: Mutex<State>,
    not_full: Condvar,
    not_empty: Condvar,
    drained: Condvar,
    ids: WorkerIds,
}

/// Everything guarded by the queue mutex.
struct State {
    status: PoolState,
    config: PoolConfig,
    queue: VecDeque<Arc<Job>>,
    workers: HashMap<usize, Worker>,
    /// Worker count given to `start`; cached workers never shrink below it.
    initial: usize,
    live: usize,
    idle: usize,
    spawned: usize,
    retired: usize,
    peak: usize,
}

impl ThreadPool {
    /// Creates a stopped pool with the default configuration.
    pub fn new() -> Self {
        Self::build(PoolConfig::default())
    }

    /// Creates a stopped pool with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the configuration is unusable.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        let state = State {
            status: PoolState::Stopped,
            config,
            queue: VecDeque::new(),
            workers: HashMap::new(),
            initial: 0,
            live: 0,
            idle: 0,
            spawned: 0,
            retired: 0,
            peak: 0,
        };
        ThreadPool {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
                drained: Condvar::new(),
                ids: WorkerIds::default(),
            }),
        }
    }

    /// Sets the scaling policy. Only valid while stopped.
    pub fn set_mode(&self, mode: PoolMode) -> Result<()> {
        self.configure(|c| c.mode = mode)
    }

    /// Sets the maximum number of queued tasks. Only valid while stopped.
    pub fn set_queue_capacity(&self, capacity: usize) -> Result<()> {
        self.configure(|c| c.queue_capacity = capacity)
    }

    /// Sets the maximum number of workers. Only valid while stopped, and
    /// only consulted in cached mode.
    pub fn set_thread_ceiling(&self, ceiling: usize) -> Result<()> {
        self.configure(|c| c.thread_ceiling = ceiling)
    }

    /// Replaces the whole configuration. Only valid while stopped.
    pub fn set_config(&self, config: PoolConfig) -> Result<()> {
        self.configure(|c| *c = config)
    }

    fn configure(&self, update: impl FnOnce(&mut PoolConfig)) -> Result<()> {
        let mut state = self.shared.lock();
        if state.status != PoolState::Stopped {
            return Err(PoolError::AlreadyRunning);
        }
        let mut config = state.config.clone();
        update(&mut config);
        config.validate()?;
        state.config = config;
        Ok(())
    }

    /// Returns a copy of the current configuration.
    pub fn config(&self) -> PoolConfig {
        self.shared.lock().config.clone()
    }

    /// Starts `workers` worker threads.
    ///
    /// In cached mode `workers` is also the floor the pool shrinks back to.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AlreadyRunning`] unless the pool is stopped, and
    /// [`PoolError::InvalidConfig`] if `workers` is zero.
    pub fn start(&self, workers: usize) -> Result<()> {
        let mut state = self.shared.lock();
        if state.status != PoolState::Stopped {
            return Err(PoolError::AlreadyRunning);
        }
        if workers == 0 {
            return Err(PoolError::InvalidConfig(
                "initial worker count must be at least 1".to_owned(),
            ));
        }
        if state.config.mode == PoolMode::Cached && workers > state.config.thread_ceiling {
            warn!(
                "Initial worker count {} exceeds thread ceiling {}, raising the ceiling",
                workers, state.config.thread_ceiling
            );
            state.config.thread_ceiling = workers;
        }

        state.status = PoolState::Running;
        state.initial = workers;
        for _ in 0..workers {
            self.shared.spawn_worker(&mut state);
        }
        debug!(
            "Thread pool started: {} workers, {:?} mode",
            workers, state.config.mode
        );
        Ok(())
    }

    /// Submits a task.
    ///
    /// Waits up to the configured submit timeout for queue space. If none
    /// frees up, or the pool is not running, the returned result is invalid
    /// and its [`get`](TaskResult::get) yields an empty value at once.
    pub fn submit<T: Task + 'static>(&self, task: T) -> TaskResult {
        let job = Job::new(Box::new(task));
        let mut result = TaskResult::bound_to(Arc::clone(&job));
        if !self.shared.enqueue(job) {
            result.reject();
        }
        result
    }

    /// Submits a closure; its return value becomes the task's value.
    pub fn submit_fn<F, R>(&self, f: F) -> TaskResult
    where
        F: FnOnce() -> R + Send + 'static,
        R: Any + Send,
    {
        self.submit(FnTask::new(f))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        self.shared.lock().status
    }

    /// Snapshot of the worker and queue counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.lock();
        PoolStats {
            live_workers: state.live,
            idle_workers: state.idle,
            queued_tasks: state.queue.len(),
            spawned: state.spawned,
            retired: state.retired,
            peak_workers: state.peak,
        }
    }

    /// Drains the pool and waits for every worker to exit.
    ///
    /// Tasks already queued still run. Does nothing unless the pool is
    /// running; afterwards the pool is stopped and may be started again.
    pub fn shutdown(&mut self) {
        let mut state = self.shared.lock();
        if state.status != PoolState::Running {
            return;
        }
        state.status = PoolState::Draining;
        debug!(
            "Draining thread pool: {} workers, {} queued tasks",
            state.live,
            state.queue.len()
        );
        self.shared.not_empty.notify_all();

        let mut state = self
            .shared
            .drained
            .wait_while(state, |s| !s.workers.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        state.status = PoolState::Stopped;
        debug!("Thread pool stopped");
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates, registers and starts one worker. Called with the lock held.
    fn spawn_worker(self: &Arc<Self>, state: &mut State) {
        let shared = Arc::clone(self);
        let worker = Worker::new(&self.ids, Box::new(move |id| shared.run_worker(id)));
        let id = worker.id();
        state.workers.entry(id).or_insert(worker).start();
        state.live += 1;
        state.idle += 1;
        state.spawned += 1;
        state.peak = state.peak.max(state.live);
    }

    /// Removes a worker from the registry. Called with the lock held, by the
    /// worker itself, right before its thread ends.
    fn retire(&self, state: &mut State, id: usize) {
        state.workers.remove(&id);
        state.live -= 1;
        state.idle -= 1;
        state.retired += 1;
        self.drained.notify_all();
    }

    /// Queues a job, growing the pool in cached mode. Returns `false` if the
    /// job was rejected.
    fn enqueue(self: &Arc<Self>, job: Arc<Job>) -> bool {
        let state = self.lock();
        if state.status != PoolState::Running {
            warn!("Thread pool is not running, submit task fail");
            return false;
        }

        let timeout = state.config.submit_timeout;
        let (mut state, wait) = self
            .not_full
            .wait_timeout_while(state, timeout, |s| s.queue.len() >= s.config.queue_capacity)
            .unwrap_or_else(PoisonError::into_inner);
        if wait.timed_out() {
            warn!("Task queue is full, submit task fail");
            return false;
        }

        state.queue.push_back(job);
        self.not_empty.notify_one();

        if state.config.mode == PoolMode::Cached
            && state.queue.len() > state.idle
            && state.live < state.config.thread_ceiling
        {
            debug!(
                "{} queued tasks, {} idle workers: adding a worker",
                state.queue.len(),
                state.idle
            );
            self.spawn_worker(&mut state);
        }
        true
    }

    /// Worker thread body.
    fn run_worker(self: &Arc<Self>, id: usize) {
        let mut last_active = Instant::now();
        let mut state = self.lock();
        loop {
            while state.queue.is_empty() {
                // Shutdown wins over idle retirement, and is only seen once
                // the queue is empty, so queued work always drains.
                if state.status != PoolState::Running {
                    self.retire(&mut state, id);
                    debug!("Worker {id} exited: pool is draining");
                    return;
                }

                match state.config.mode {
                    PoolMode::Fixed => {
                        state = self
                            .not_empty
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    PoolMode::Cached => {
                        let poll = state.config.idle_poll;
                        let (guard, wait) = self
                            .not_empty
                            .wait_timeout(state, poll)
                            .unwrap_or_else(PoisonError::into_inner);
                        state = guard;
                        if wait.timed_out()
                            && last_active.elapsed() >= state.config.idle_timeout
                            && state.live > state.initial
                        {
                            self.retire(&mut state, id);
                            debug!("Worker {id} retired after idling");
                            return;
                        }
                    }
                }
            }

            let Some(job) = state.queue.pop_front() else {
                continue;
            };
            state.idle -= 1;
            if !state.queue.is_empty() {
                self.not_empty.notify_one();
            }
            self.not_full.notify_one();
            drop(state);

            job.execute();
            drop(job);

            state = self.lock();
            state.idle += 1;
            last_active = Instant::now();
        }
    }
}
