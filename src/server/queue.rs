//! Bounded handoff between the acceptor and the worker pool.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Returned by [`DispatchQueue::push`] once the queue is closed; carries the
/// rejected item back to the caller.
pub struct Closed<T>(pub T);

impl<T> fmt::Debug for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Closed(..)")
    }
}

impl<T> fmt::Display for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dispatch queue is closed")
    }
}

impl<T> Error for Closed<T> {}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
    unfinished: usize,
}

/// Fixed-capacity blocking FIFO.
///
/// `push` waits while the queue is full and `pop` waits while it is empty.
/// `close` wakes every waiter: pushes fail, pops return `None`.
pub struct DispatchQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> DispatchQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                unfinished: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Capacity of `workers × backlog_factor`.
    pub fn with_backlog(workers: usize, backlog_factor: usize) -> Self {
        Self::new(workers.max(1).saturating_mul(backlog_factor.max(1)))
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Nothing inside the lock can panic halfway through an update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues `item`, blocking while the queue is full.
    pub fn push(&self, item: T) -> Result<(), Closed<T>> {
        let mut state = self.lock();
        while state.items.len() >= self.capacity && !state.closed {
            state = self.not_full.wait(state).unwrap_or_else(PoisonError::into_inner);
        }

        if state.closed {
            return Err(Closed(item));
        }

        state.items.push_back(item);
        state.unfinished += 1;
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeues the oldest item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed, even if items remain; those
    /// are left for [`drain`](Self::drain).
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            state = self.not_empty.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marks one popped item as fully handled.
    pub fn task_done(&self) {
        let mut state = self.lock();
        state.unfinished = state.unfinished.saturating_sub(1);
    }

    /// Items pushed but not yet marked done: queued plus in service.
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }

    /// Items waiting to be popped.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Rejects further pushes and wakes everything blocked on the queue.
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Removes and returns every item still waiting.
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.lock();
        let items: Vec<T> = state.items.drain(..).collect();
        state.unfinished = state.unfinished.saturating_sub(items.len());
        drop(state);
        self.not_full.notify_all();
        items
    }
}
