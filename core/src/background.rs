//! Background execution: ordered workers, an unordered pool, timers and IO.
//!
//! [`BackgroundPool`] bundles everything that must stay off the UI and
//! engine threads:
//!
//! - **Ordered workers**: a fixed set of [`EditorTaskExecutor`]s fed
//!   round-robin. Tasks that land on the same worker keep their order.
//! - **Unordered pool**: blocking closures on tokio's blocking pool.
//! - **Scheduling**: one-shot delayed tasks and fixed-rate repeating tasks,
//!   driven by tokio timers.
//! - **Async IO**: futures run on the tokio runtime, results delivered
//!   through an [`IoHandle`] that any thread can poll.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;

use crate::config::BackgroundConfig;
use crate::error::{ExecutorError, ExecutorResult};
use crate::executor::EditorTaskExecutor;
use crate::task::run_guarded;

/// How long [`BackgroundPool`] waits for blocking tasks when dropped.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Background executors plus the tokio runtime behind the pool and timers.
pub struct BackgroundPool {
    workers: Vec<EditorTaskExecutor>,
    next_worker: AtomicUsize,
    handle: tokio::runtime::Handle,
    runtime: Mutex<Option<tokio::runtime::Runtime>>,
    next_seq: Arc<AtomicU64>,
    shut_down: AtomicBool,
}

impl BackgroundPool {
    pub fn new(config: &BackgroundConfig) -> ExecutorResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.runtime_threads.max(1))
            .max_blocking_threads(config.pool_threads.max(1))
            .thread_name("background-pool")
            .enable_all()
            .build()
            .map_err(ExecutorError::Runtime)?;

        let workers = (0..config.executors.max(1))
            .map(|i| EditorTaskExecutor::spawn(format!("background-{i}")))
            .collect::<ExecutorResult<Vec<_>>>()?;

        Ok(Self {
            workers,
            next_worker: AtomicUsize::new(0),
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            next_seq: Arc::new(AtomicU64::new(0)),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Submits a task to the next ordered worker (round-robin).
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let idx = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[idx].submit(task);
    }

    /// Runs a blocking task on the unordered pool.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shut_down() {
            log::warn!("background pool is shut down, task dropped");
            return;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        drop(self.handle.spawn_blocking(move || {
            run_guarded("pool", seq, task);
        }));
    }

    /// Runs `task` once on the pool after `delay`.
    pub fn schedule<F>(&self, task: F, delay: Duration) -> ScheduledTask
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shut_down() {
            log::warn!("background pool is shut down, scheduled task dropped");
            return ScheduledTask::finished();
        }
        let next_seq = self.next_seq.clone();
        let handle = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let seq = next_seq.fetch_add(1, Ordering::Relaxed);
            let _ = tokio::task::spawn_blocking(move || run_guarded("scheduler", seq, task)).await;
        });
        ScheduledTask {
            handle: Some(handle),
        }
    }

    /// Runs `task` on the pool every `period`, first after one period.
    ///
    /// Invocations are independent: a slow run does not delay or block the
    /// next one, so the task itself must tolerate overlap. A zero period is
    /// clamped to one millisecond.
    pub fn schedule_at_fixed_rate<F>(&self, task: F, period: Duration) -> ScheduledTask
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.is_shut_down() {
            log::warn!("background pool is shut down, fixed-rate task dropped");
            return ScheduledTask::finished();
        }
        let period = if period.is_zero() {
            log::warn!("fixed-rate period of zero clamped to 1ms");
            Duration::from_millis(1)
        } else {
            period
        };
        let task = Arc::new(task);
        let next_seq = self.next_seq.clone();
        let handle = self.handle.spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                let task = task.clone();
                let seq = next_seq.fetch_add(1, Ordering::Relaxed);
                drop(tokio::task::spawn_blocking(move || {
                    run_guarded("scheduler", seq, || task());
                }));
            }
        });
        ScheduledTask {
            handle: Some(handle),
        }
    }

    /// Drives an async IO future on the background runtime.
    ///
    /// After shutdown the future is dropped and the handle never yields.
    pub fn run_io<T, F>(&self, future: F) -> IoHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        if self.is_shut_down() {
            log::warn!("background pool is shut down, IO future dropped");
            return IoHandle { receiver };
        }
        self.handle.spawn(async move {
            let result = future.await;
            let _ = sender.send(result);
        });
        IoHandle { receiver }
    }

    /// Number of ordered workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Stops the workers (after their queued tasks) and the runtime.
    ///
    /// Blocking pool tasks get up to `timeout` to finish. Idempotent.
    pub fn shutdown(&self, timeout: Duration) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        for worker in &self.workers {
            worker.shutdown();
        }
        if let Some(runtime) = self.runtime.lock().take() {
            // A runtime cannot block on its own shutdown from inside itself.
            if tokio::runtime::Handle::try_current().is_ok() {
                runtime.shutdown_background();
            } else {
                runtime.shutdown_timeout(timeout);
            }
        }
        log::debug!("background pool stopped");
    }
}

impl Drop for BackgroundPool {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

impl fmt::Debug for BackgroundPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundPool")
            .field("workers", &self.workers.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Handle to a scheduled (one-shot or repeating) background task.
///
/// Dropping the handle does not cancel the schedule; call
/// [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct ScheduledTask {
    // `None` when the pool was already shut down.
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ScheduledTask {
    fn finished() -> Self {
        Self { handle: None }
    }

    /// Stops future invocations. A run already in progress completes.
    pub fn cancel(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    /// Returns `true` once a one-shot task has run or the schedule was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|handle| handle.is_finished())
    }
}

/// Result slot of an async IO operation started with
/// [`BackgroundPool::run_io`].
///
/// Poll it from any thread; the UI thread typically calls
/// [`try_recv`](Self::try_recv) once per frame.
#[derive(Debug)]
pub struct IoHandle<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> IoHandle<T> {
    /// Returns the result if it is ready.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until the result is ready. `None` if the future was dropped.
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Blocks up to `timeout` for the result.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }
}
