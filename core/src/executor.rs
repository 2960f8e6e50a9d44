//! Dedicated single-threaded task executor.
//!
//! [`EditorTaskExecutor`] owns one named OS thread that drains a
//! [`TaskQueue`] in batches. Any thread may submit; tasks run one at a time,
//! in submission order, on the executor thread. A panicking task is logged
//! and counted, and the loop moves on to the next task.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{ExecutorError, ExecutorResult};
use crate::task::{Task, run_guarded};
use crate::task_queue::TaskQueue;

/// Counters collected by an executor thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Tasks that ran, including the ones that panicked.
    pub executed: u64,
    /// Tasks that panicked.
    pub failed: u64,
    /// Batches taken from the queue.
    pub batches: u64,
}

#[derive(Default)]
struct Counters {
    executed: AtomicU64,
    failed: AtomicU64,
    batches: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ExecutorStats {
        ExecutorStats {
            executed: self.executed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            batches: self.batches.load(Ordering::Acquire),
        }
    }
}

/// A worker thread that executes submitted tasks one after another.
///
/// # Example
///
/// ```
/// use fernlight_core::EditorTaskExecutor;
/// use std::time::Duration;
///
/// let executor = EditorTaskExecutor::spawn("loader").unwrap();
/// executor.submit(|| println!("runs on the loader thread"));
/// assert!(executor.flush(Duration::from_secs(1)));
/// ```
pub struct EditorTaskExecutor {
    name: Arc<str>,
    queue: Arc<TaskQueue<Task>>,
    counters: Arc<Counters>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EditorTaskExecutor {
    /// Starts a new executor thread with the given name.
    pub fn spawn(name: impl Into<String>) -> ExecutorResult<Self> {
        let name: String = name.into();
        let queue = Arc::new(TaskQueue::new());
        let counters = Arc::new(Counters::default());

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn({
                let name: Arc<str> = Arc::from(name.as_str());
                let queue = queue.clone();
                let counters = counters.clone();
                move || run_loop(&name, &queue, &counters)
            })
            .map_err(|source| ExecutorError::ThreadSpawn {
                name: name.clone(),
                source,
            })?;

        log::debug!("executor \"{name}\" started");

        Ok(Self {
            name: Arc::from(name),
            queue,
            counters,
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// The executor (and thread) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submits a task. Never blocks beyond the queue lock.
    ///
    /// Tasks submitted after [`shutdown`](Self::shutdown) are dropped with a
    /// warning.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_boxed(Box::new(task));
    }

    /// Submits an already boxed task.
    pub fn submit_boxed(&self, task: Task) {
        if !self.queue.push(task) {
            log::warn!("executor \"{}\" is shut down, task dropped", self.name);
        }
    }

    /// Number of tasks waiting for the next batch.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// A snapshot of the execution counters.
    pub fn stats(&self) -> ExecutorStats {
        self.counters.snapshot()
    }

    /// Returns `true` when called from this executor's thread.
    pub fn is_executor_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Blocks until every task submitted by the calling thread before this
    /// call has run, or until `timeout` elapses.
    ///
    /// Returns `false` on timeout, after shutdown, or when called from the
    /// executor thread itself (which would deadlock).
    pub fn flush(&self, timeout: Duration) -> bool {
        if self.is_executor_thread() {
            log::warn!("flush() called on executor \"{}\" from its own thread", self.name);
            return false;
        }
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        if !self.queue.push(Box::new(move || {
            let _ = tx.send(());
        })) {
            return false;
        }
        rx.recv_timeout(timeout).is_ok()
    }

    /// Stops accepting tasks, runs what is already queued and joins the thread.
    ///
    /// Idempotent. When called from the executor thread itself the join is
    /// skipped; the loop still exits after the current batch.
    pub fn shutdown(&self) {
        self.queue.close();
        if self.is_executor_thread() {
            return;
        }
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            log::error!("executor \"{}\" thread terminated abnormally", self.name);
        }
    }
}

impl Drop for EditorTaskExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for EditorTaskExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorTaskExecutor")
            .field("name", &self.name)
            .field("pending", &self.queue.len())
            .field("stats", &self.counters.snapshot())
            .finish()
    }
}

fn run_loop(name: &str, queue: &TaskQueue<Task>, counters: &Counters) {
    while let Some(batch) = queue.wait_drain() {
        crate::profile_scope_dynamic!(name);
        counters.batches.fetch_add(1, Ordering::AcqRel);
        for queued in batch {
            let ok = run_guarded(name, queued.seq, queued.item);
            counters.executed.fetch_add(1, Ordering::AcqRel);
            if !ok {
                counters.failed.fetch_add(1, Ordering::AcqRel);
            }
        }
    }
    log::debug!("executor \"{name}\" stopped");
}
