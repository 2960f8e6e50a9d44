//! Thread-safe pending-task queue feeding a single consumer.
//!
//! [`TaskQueue`] uses interior mutability ([`Mutex`] + [`Condvar`]) so that
//! any number of producer threads can [`push`](TaskQueue::push) through a
//! shared reference. The consumer takes whole batches at once: the pending
//! list is swapped out under the lock, so tasks submitted while a batch is
//! executing land in a fresh list instead of extending the running batch.

use std::fmt;

use parking_lot::{Condvar, Mutex};

/// An item tagged with its submission sequence number.
///
/// Sequence numbers are per queue, start at zero and increase by one per
/// push. They only serve as task identity in log messages.
#[derive(Debug)]
pub struct Queued<T> {
    pub seq: u64,
    pub item: T,
}

struct QueueState<T> {
    pending: Vec<Queued<T>>,
    next_seq: u64,
    closed: bool,
}

/// A thread-safe FIFO of pending items with batch-swap draining.
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> TaskQueue<T> {
    /// Creates a new empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: Vec::new(),
                next_seq: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends an item and wakes a waiting consumer.
    ///
    /// Returns `false` (dropping the item) if the queue has been closed.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push(Queued { seq, item });
        drop(state);
        self.available.notify_one();
        true
    }

    /// Takes every pending item, in submission order, without blocking.
    pub fn drain(&self) -> Vec<Queued<T>> {
        std::mem::take(&mut self.state.lock().pending)
    }

    /// Takes at most `max` pending items from the front, in submission order.
    ///
    /// The remaining items keep their order and stay queued. `max == 0`
    /// means unbounded.
    pub fn drain_up_to(&self, max: usize) -> Vec<Queued<T>> {
        let mut state = self.state.lock();
        if max == 0 || state.pending.len() <= max {
            return std::mem::take(&mut state.pending);
        }
        let rest = state.pending.split_off(max);
        std::mem::replace(&mut state.pending, rest)
    }

    /// Blocks until items are pending, then takes all of them.
    ///
    /// Returns `None` once the queue is closed and fully drained. Items
    /// pushed before [`close`](Self::close) are still handed out.
    pub fn wait_drain(&self) -> Option<Vec<Queued<T>>> {
        let mut state = self.state.lock();
        loop {
            if !state.pending.is_empty() {
                return Some(std::mem::take(&mut state.pending));
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Closes the queue: further pushes are rejected and blocked consumers wake.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Returns `true` if [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of pending items.
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Returns `true` if there are no pending items.
    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskQueue")
            .field("pending", &state.pending.len())
            .field("next_seq", &state.next_seq)
            .field("closed", &state.closed)
            .finish()
    }
}
