//! The engine thread: sole owner of the [`Scene`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use fernlight_core::{ExecutorManager, panic_payload_to_string};

use crate::error::{EditorError, EditorResult};
use crate::scene::Scene;

/// Upper bound on the extra ticks run after [`EngineThread::stop`].
pub const MAX_DRAIN_ROUNDS: usize = 1024;

/// Runs the engine loop on a dedicated thread.
///
/// Every tick drains the manager's engine queue into the scene and then
/// runs [`Scene::update`] with the fixed timestep. The scene never leaves
/// the thread until [`stop`](Self::stop) hands it back.
pub struct EngineThread {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<Scene>>,
}

impl EngineThread {
    pub fn spawn(
        manager: ExecutorManager<Scene>,
        scene: Scene,
        tick: Duration,
    ) -> EditorResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));
        let handle = std::thread::Builder::new()
            .name("engine".into())
            .spawn({
                let running = running.clone();
                let ticks = ticks.clone();
                move || run_loop(manager, scene, tick, &running, &ticks)
            })
            .map_err(EditorError::EngineSpawn)?;
        log::debug!("Engine thread started ({tick:?} per tick)");
        Ok(Self {
            running,
            ticks,
            handle: Some(handle),
        })
    }

    /// Completed ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Blocks until at least `count` ticks completed or `timeout` passed.
    pub fn wait_for_ticks(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.ticks() < count {
            if Instant::now() >= deadline || !self.is_running() {
                return self.ticks() >= count;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Stops the loop after the current tick, runs any engine tasks still
    /// queued, and returns the scene.
    pub fn stop(mut self) -> EditorResult<Scene> {
        self.running.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|payload| EditorError::EnginePanicked(panic_payload_to_string(payload.as_ref()))),
            None => Err(EditorError::EnginePanicked("engine thread already joined".into())),
        }
    }
}

impl Drop for EngineThread {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Engine thread panicked");
        }
    }
}

impl std::fmt::Debug for EngineThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineThread")
            .field("ticks", &self.ticks())
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_loop(
    manager: ExecutorManager<Scene>,
    mut scene: Scene,
    tick: Duration,
    running: &AtomicBool,
    ticks: &AtomicU64,
) -> Scene {
    fernlight_core::set_thread_name!("engine");
    let tpf = tick.as_secs_f32();
    while running.load(Ordering::Acquire) {
        let start = Instant::now();
        {
            fernlight_core::profile_scope!("engine tick");
            manager.engine_tick(&mut scene);
            scene.update(tpf);
        }
        ticks.fetch_add(1, Ordering::AcqRel);
        fernlight_core::frame_mark!();
        if let Some(rest) = tick.checked_sub(start.elapsed()) {
            std::thread::sleep(rest);
        }
    }
    // Mutations already posted still belong to this scene.
    let mut rounds = 0;
    while manager.pending_engine_tasks() > 0 {
        if rounds == MAX_DRAIN_ROUNDS {
            log::warn!(
                "Engine stopped with {} tasks still queued after {rounds} drain rounds",
                manager.pending_engine_tasks()
            );
            break;
        }
        if manager.engine_tick(&mut scene) == 0 {
            break;
        }
        rounds += 1;
    }
    log::debug!("Engine thread stopped after {} ticks", ticks.load(Ordering::Acquire));
    scene
}
