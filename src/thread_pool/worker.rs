use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::debug;

/// Body run by a worker thread; receives the worker's own id.
pub(crate) type WorkerBody = Box<dyn FnOnce(usize) + Send + 'static>;

/// Hands out worker ids, unique within one pool.
#[derive(Debug, Default)]
pub(crate) struct WorkerIds {
    next: AtomicUsize,
}

impl WorkerIds {
    fn next(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// An identified worker thread.
///
/// The thread is detached once started: the `Worker` keeps no join handle,
/// and the thread ends when its body returns.
pub(crate) struct Worker {
    id: usize,
    body: Option<WorkerBody>,
}

impl Worker {
    pub(crate) fn new(ids: &WorkerIds, body: WorkerBody) -> Self {
        Worker {
            id: ids.next(),
            body: Some(body),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Launches the thread. Starting twice has no effect.
    pub(crate) fn start(&mut self) {
        let Some(body) = self.body.take() else {
            return;
        };
        let id = self.id;
        thread::Builder::new()
            .name(format!("pool-worker-{id}"))
            .spawn(move || body(id))
            .expect("failed to spawn worker thread");
        debug!("Worker {id} started");
    }
}
