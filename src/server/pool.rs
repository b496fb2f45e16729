//! Fixed-size pool of blocking worker threads.
//!
//! Every worker loops on "pop an item, run the handler to completion, mark it
//! done". A handler that fails or panics costs one item, never the worker.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::server::queue::DispatchQueue;

/// Outcome of [`WorkerPool::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers that exited before the deadline
    pub joined: usize,
    /// Workers still busy at the deadline, left detached
    pub abandoned: usize,
    /// Queued items that no worker picked up
    pub dropped: usize,
}

pub struct WorkerPool<T> {
    queue: Arc<DispatchQueue<T>>,
    running: Arc<AtomicBool>,
    handles: Vec<Option<JoinHandle<()>>>,
    exits: Receiver<usize>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Starts `size` workers consuming `queue` with `handler`.
    pub fn spawn<F>(size: usize, queue: Arc<DispatchQueue<T>>, handler: F) -> io::Result<Self>
    where
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let running = Arc::new(AtomicBool::new(true));
        let (exit_tx, exits) = mpsc::channel();

        let mut handles = Vec::with_capacity(size);
        for id in 0..size.max(1) {
            let worker = Worker {
                id,
                queue: Arc::clone(&queue),
                running: Arc::clone(&running),
                _exit: ExitNotice { id, tx: exit_tx.clone() },
            };
            let handler = Arc::clone(&handler);

            let handle = thread::Builder::new()
                .name(format!("wicket-worker-{id}"))
                .spawn(move || worker.run(handler.as_ref()));

            match handle {
                Ok(handle) => handles.push(Some(handle)),
                Err(e) => {
                    // Let the workers that did start wind down.
                    running.store(false, Ordering::Release);
                    queue.close();
                    return Err(e);
                }
            }
        }

        tracing::debug!(workers = handles.len(), capacity = queue.capacity(), "worker pool started");

        Ok(Self {
            queue,
            running,
            handles,
            exits,
        })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Workers that have not been joined or abandoned yet.
    pub fn live(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }

    /// Stops the pool, waiting at most `timeout` for workers to exit.
    ///
    /// A worker in the middle of an item finishes it first. Workers that are
    /// still busy when the deadline passes are detached and keep running
    /// until their item completes.
    pub fn shutdown(&mut self, timeout: Duration) -> ShutdownReport {
        self.running.store(false, Ordering::Release);
        self.queue.close();

        let mut report = ShutdownReport {
            dropped: self.queue.drain().len(),
            ..ShutdownReport::default()
        };

        let deadline = Instant::now() + timeout;
        while self.live() > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            let Ok(id) = self.exits.recv_timeout(left) else {
                break;
            };
            if let Some(handle) = self.handles.get_mut(id).and_then(Option::take) {
                if handle.join().is_err() {
                    tracing::error!(worker = id, "worker thread panicked outside its handler");
                }
                report.joined += 1;
            }
        }

        for (id, handle) in self.handles.iter_mut().enumerate() {
            if handle.take().is_some() {
                tracing::warn!(worker = id, "worker still busy at shutdown deadline, abandoning");
                report.abandoned += 1;
            }
        }

        report
    }
}

impl<T> Drop for WorkerPool<T> {
    /// Releases idle workers without waiting for them. Busy workers exit
    /// once their current item is done.
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.queue.close();
    }
}

struct Worker<T> {
    id: usize,
    queue: Arc<DispatchQueue<T>>,
    running: Arc<AtomicBool>,
    _exit: ExitNotice,
}

impl<T> Worker<T> {
    fn run<F>(self, handler: &F)
    where
        F: Fn(T) -> anyhow::Result<()>,
    {
        while self.running.load(Ordering::Acquire) {
            let Some(item) = self.queue.pop() else {
                break;
            };

            match panic::catch_unwind(AssertUnwindSafe(|| handler(item))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(worker = self.id, error = ?e, "connection handler failed");
                }
                Err(payload) => {
                    tracing::error!(
                        worker = self.id,
                        panic = panic_message(payload.as_ref()),
                        "connection handler panicked"
                    );
                }
            }

            self.queue.task_done();
        }

        tracing::debug!(worker = self.id, "worker exiting");
    }
}

/// Reports the worker's exit on drop, unwinding included.
struct ExitNotice {
    id: usize,
    tx: Sender<usize>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.tx.send(self.id);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
