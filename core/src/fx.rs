//! UI-thread dispatch.
//!
//! The GUI toolkit owns the UI thread; the core only needs its "run this
//! later on the UI thread" primitive, abstracted as [`UiToolkit`]. Tasks
//! posted before a toolkit is attached (editor startup) are buffered by
//! [`FxDispatcher`] and handed over in order on attach.

use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::Mutex;

use crate::error::ExecutorResult;
use crate::executor::EditorTaskExecutor;
use crate::task::{FxTask, run_guarded};
use crate::task_queue::TaskQueue;

/// The GUI toolkit's thread-marshalling primitive.
pub trait UiToolkit: Send + Sync {
    /// Schedules `task` on the UI thread. Must not run it synchronously on a
    /// non-UI thread. Tasks from the same caller run in submission order.
    fn run_later(&self, task: FxTask);

    /// Returns `true` when called on the UI thread.
    fn is_ui_thread(&self) -> bool;
}

enum FxState {
    Buffering(Vec<FxTask>),
    Attached(Arc<dyn UiToolkit>),
}

/// Routes [`FxTask`]s to the attached [`UiToolkit`].
pub struct FxDispatcher {
    state: Mutex<FxState>,
}

impl FxDispatcher {
    /// Creates a dispatcher that buffers until a toolkit is attached.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FxState::Buffering(Vec::new())),
        }
    }

    /// Attaches the toolkit and forwards buffered tasks in submission order.
    ///
    /// Attaching a second toolkit replaces the first; tasks already handed
    /// to the old toolkit stay with it.
    pub fn attach(&self, toolkit: Arc<dyn UiToolkit>) {
        let mut state = self.state.lock();
        // Forward under the lock so concurrent submitters cannot overtake
        // the buffered tasks.
        if let FxState::Buffering(buffered) = &mut *state {
            let buffered = std::mem::take(buffered);
            if !buffered.is_empty() {
                log::debug!("forwarding {} buffered UI tasks", buffered.len());
            }
            for task in buffered {
                toolkit.run_later(task);
            }
        }
        *state = FxState::Attached(toolkit);
    }

    /// Posts a task to the UI thread, or buffers it until attach.
    pub fn submit(&self, task: FxTask) {
        let toolkit = match &mut *self.state.lock() {
            FxState::Buffering(buffered) => {
                buffered.push(task);
                return;
            }
            FxState::Attached(toolkit) => toolkit.clone(),
        };
        toolkit.run_later(task);
    }

    pub fn is_attached(&self) -> bool {
        matches!(*self.state.lock(), FxState::Attached(_))
    }

    /// Returns `true` on the UI thread; always `false` before attach.
    pub fn is_ui_thread(&self) -> bool {
        match &*self.state.lock() {
            FxState::Buffering(_) => false,
            FxState::Attached(toolkit) => toolkit.is_ui_thread(),
        }
    }

    /// Number of tasks waiting for a toolkit.
    pub fn buffered_count(&self) -> usize {
        match &*self.state.lock() {
            FxState::Buffering(buffered) => buffered.len(),
            FxState::Attached(_) => 0,
        }
    }
}

impl Default for FxDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FxDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FxDispatcher")
            .field("attached", &self.is_attached())
            .field("buffered", &self.buffered_count())
            .finish()
    }
}

/// A toolkit stand-in whose UI thread is a dedicated executor thread.
///
/// Used by headless runs and tests where no real GUI toolkit exists.
#[derive(Debug)]
pub struct HeadlessToolkit {
    executor: EditorTaskExecutor,
}

impl HeadlessToolkit {
    pub fn spawn(thread_name: &str) -> ExecutorResult<Self> {
        Ok(Self {
            executor: EditorTaskExecutor::spawn(thread_name)?,
        })
    }

    /// The executor playing the UI thread.
    pub fn executor(&self) -> &EditorTaskExecutor {
        &self.executor
    }
}

impl UiToolkit for HeadlessToolkit {
    fn run_later(&self, task: FxTask) {
        self.executor.submit_boxed(task.into_inner());
    }

    fn is_ui_thread(&self) -> bool {
        self.executor.is_executor_thread()
    }
}

/// A toolkit for hosts that own a frame loop instead of a task scheduler.
///
/// The thread that creates it is the UI thread; that thread calls
/// [`pump`](Self::pump) once per frame to run everything posted since the
/// previous frame. Tests use it to step the UI context deterministically.
pub struct PumpedToolkit {
    queue: TaskQueue<FxTask>,
    owner: ThreadId,
}

impl PumpedToolkit {
    pub fn new() -> Self {
        Self {
            queue: TaskQueue::new(),
            owner: std::thread::current().id(),
        }
    }

    /// Runs the tasks posted so far. Tasks posted while pumping wait for the
    /// next call. Returns the number of tasks that ran.
    pub fn pump(&self) -> usize {
        if !self.is_ui_thread() {
            log::warn!("PumpedToolkit::pump() called off the owning thread");
        }
        let batch = self.queue.drain();
        let count = batch.len();
        for queued in batch {
            let task = queued.item;
            run_guarded("fx", queued.seq, || task.run());
        }
        count
    }

    /// Pumps until no task is left, at most `max_rounds` times.
    pub fn pump_until_idle(&self, max_rounds: usize) -> usize {
        let mut total = 0;
        for _ in 0..max_rounds {
            let ran = self.pump();
            if ran == 0 {
                break;
            }
            total += ran;
        }
        total
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }
}

impl Default for PumpedToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PumpedToolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PumpedToolkit")
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl UiToolkit for PumpedToolkit {
    fn run_later(&self, task: FxTask) {
        self.queue.push(task);
    }

    fn is_ui_thread(&self) -> bool {
        std::thread::current().id() == self.owner
    }
}
