//! The executor context object shared by every editor component.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::background::{BackgroundPool, DEFAULT_SHUTDOWN_TIMEOUT, IoHandle, ScheduledTask};
use crate::config::ExecutorConfig;
use crate::engine_queue::EngineTaskQueue;
use crate::error::ExecutorResult;
use crate::fx::{FxDispatcher, UiToolkit};
use crate::task::FxTask;

struct ManagerInner<S> {
    config: ExecutorConfig,
    fx: FxDispatcher,
    engine: EngineTaskQueue<S>,
    background: BackgroundPool,
}

/// Moves work between the UI thread, the engine thread and background
/// workers.
///
/// Constructed once at startup and cloned into whatever needs to dispatch;
/// clones share the same queues. `S` is the engine scene type: engine tasks
/// receive `&mut S` when the engine loop calls
/// [`engine_tick`](Self::engine_tick).
///
/// Every dispatch method may be called from any thread, including from a
/// task that is currently running in any of the three contexts. None of
/// them wait for the posted task.
///
/// # Example
///
/// ```
/// use fernlight_core::{ExecutorConfig, ExecutorManager};
///
/// let manager = ExecutorManager::<Vec<u32>>::new(ExecutorConfig::default()).unwrap();
/// manager.add_engine_task(|scene| scene.push(7));
///
/// let mut scene = Vec::new();
/// assert_eq!(manager.engine_tick(&mut scene), 1);
/// assert_eq!(scene, vec![7]);
/// ```
pub struct ExecutorManager<S> {
    inner: Arc<ManagerInner<S>>,
}

impl<S> Clone for ExecutorManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: 'static> ExecutorManager<S> {
    /// Starts the background workers and runtime.
    ///
    /// UI tasks are buffered until [`attach_ui_toolkit`](Self::attach_ui_toolkit).
    pub fn new(config: ExecutorConfig) -> ExecutorResult<Self> {
        let background = BackgroundPool::new(&config.background)?;
        let engine = EngineTaskQueue::new(config.engine.max_tasks_per_tick);
        log::debug!(
            "executor manager started: {} background executors, {} engine tasks per tick",
            background.worker_count(),
            config.engine.max_tasks_per_tick
        );
        Ok(Self {
            inner: Arc::new(ManagerInner {
                config,
                fx: FxDispatcher::new(),
                engine,
                background,
            }),
        })
    }

    /// Posts a task to the UI thread.
    ///
    /// Always deferred, even when called on the UI thread.
    pub fn add_fx_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.fx.submit(FxTask::new(task));
    }

    /// Posts a task to the engine thread. It runs during a later
    /// [`engine_tick`](Self::engine_tick).
    ///
    /// Returns `false` after [`shutdown`](Self::shutdown); the task is dropped.
    pub fn add_engine_task<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.inner.engine.submit(task)
    }

    /// Posts a task to one of the ordered background executors.
    pub fn add_background_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.background.submit(task);
    }

    /// Runs a blocking task on the unordered background pool.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.background.execute(task);
    }

    /// Runs a task once on the background pool after `delay`.
    pub fn schedule<F>(&self, task: F, delay: Duration) -> ScheduledTask
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.background.schedule(task, delay)
    }

    /// Runs a task on the background pool every `period` until cancelled.
    pub fn schedule_at_fixed_rate<F>(&self, task: F, period: Duration) -> ScheduledTask
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.background.schedule_at_fixed_rate(task, period)
    }

    /// Drives an async IO future on the background runtime.
    pub fn run_io<T, F>(&self, future: F) -> IoHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        self.inner.background.run_io(future)
    }

    /// Connects the GUI toolkit. Buffered UI tasks are forwarded in order.
    pub fn attach_ui_toolkit(&self, toolkit: Arc<dyn UiToolkit>) {
        self.inner.fx.attach(toolkit);
    }

    /// Returns `true` when called on the UI thread of the attached toolkit.
    pub fn is_fx_thread(&self) -> bool {
        self.inner.fx.is_ui_thread()
    }

    /// Runs one bounded batch of engine tasks against `scene`.
    ///
    /// Called by the engine loop once per tick, before the engine's own
    /// per-frame update. Returns the number of tasks that ran.
    pub fn engine_tick(&self, scene: &mut S) -> usize {
        self.inner.engine.execute(scene)
    }

    /// Engine tasks waiting for the next tick.
    pub fn pending_engine_tasks(&self) -> usize {
        self.inner.engine.pending_count()
    }

    /// `true` once [`shutdown`](Self::shutdown) has closed the engine queue.
    pub fn is_shut_down(&self) -> bool {
        self.inner.engine.is_closed()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    pub fn fx(&self) -> &FxDispatcher {
        &self.inner.fx
    }

    pub fn background(&self) -> &BackgroundPool {
        &self.inner.background
    }

    /// Stops the background executors and runtime, and closes the engine
    /// queue. Engine tasks already queued still run on later ticks.
    pub fn shutdown(&self) {
        self.inner.engine.close();
        self.inner.background.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

impl<S> fmt::Debug for ExecutorManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorManager")
            .field("fx", &self.inner.fx)
            .field("engine", &self.inner.engine)
            .field("background", &self.inner.background)
            .finish()
    }
}
