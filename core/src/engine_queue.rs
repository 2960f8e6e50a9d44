//! Engine-thread task queue, drained once per engine tick.

use std::fmt;

use crate::task::{EngineTask, run_guarded};
use crate::task_queue::TaskQueue;

/// Tasks waiting for the engine thread.
///
/// The engine loop calls [`execute`](Self::execute) exactly once per tick
/// with its scene. This is the only place engine tasks run, so they never
/// interleave with the engine's own per-frame work on the scene.
pub struct EngineTaskQueue<S> {
    queue: TaskQueue<EngineTask<S>>,
    max_per_tick: usize,
}

impl<S> EngineTaskQueue<S> {
    /// Creates a queue that runs at most `max_per_tick` tasks per tick
    /// (`0` = no limit).
    pub fn new(max_per_tick: usize) -> Self {
        Self {
            queue: TaskQueue::new(),
            max_per_tick,
        }
    }

    /// Queues a task for a later tick. Returns `false`, dropping the task,
    /// once the queue is closed.
    pub fn submit<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        let accepted = self.queue.push(EngineTask::new(f));
        if !accepted {
            log::warn!("engine queue is closed, task dropped");
        }
        accepted
    }

    /// Runs one bounded batch of pending tasks against `scene`.
    ///
    /// Must be called from the engine loop. Tasks submitted while the batch
    /// runs, and tasks beyond the per-tick limit, wait for the next tick.
    /// Returns the number of tasks that ran.
    pub fn execute(&self, scene: &mut S) -> usize {
        crate::profile_scope!("engine: execute tasks");
        let batch = self.queue.drain_up_to(self.max_per_tick);
        let count = batch.len();
        crate::profile_plot!("engine tasks per tick", count);
        for queued in batch {
            let task = queued.item;
            run_guarded("engine", queued.seq, || task.run(scene));
        }
        count
    }

    /// Stops accepting tasks. Already queued tasks still run on later ticks.
    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn max_per_tick(&self) -> usize {
        self.max_per_tick
    }
}

impl<S> fmt::Debug for EngineTaskQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineTaskQueue")
            .field("pending", &self.queue.len())
            .field("max_per_tick", &self.max_per_tick)
            .finish()
    }
}
