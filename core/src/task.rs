//! Task types for the three execution contexts.
//!
//! - [`Task`]: generic background work
//! - [`FxTask`]: work that must run on the UI thread
//! - [`EngineTask`]: work that must run on the engine thread; it receives
//!   `&mut S`, which only the engine tick can hand out
//!
//! Tasks have no return value. A task either completes or panics; the
//! hosting executor catches the panic at the task boundary and keeps going.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Type-erased unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work bound to the UI thread.
///
/// Only [`UiToolkit`](crate::UiToolkit) implementations run these.
pub struct FxTask(Task);

impl FxTask {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Runs the task. Must be called on the UI thread.
    pub fn run(self) {
        (self.0)()
    }

    /// Unwraps the closure, e.g. to hand it to an executor acting as UI thread.
    pub fn into_inner(self) -> Task {
        self.0
    }
}

impl fmt::Debug for FxTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FxTask")
    }
}

/// A unit of work bound to the engine thread.
///
/// The closure receives exclusive access to the engine scene. Because the
/// engine loop is the only owner of `&mut S`, scene mutation from any other
/// context does not type-check.
pub struct EngineTask<S>(Box<dyn FnOnce(&mut S) + Send + 'static>);

impl<S> EngineTask<S> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub fn run(self, scene: &mut S) {
        (self.0)(scene)
    }
}

impl<S> fmt::Debug for EngineTask<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EngineTask")
    }
}

/// Shared cancellation flag for submitted tasks.
///
/// Dispatch is fire-and-forget, so a task cannot be pulled back out of a
/// queue. Wrapping it with [`guard`](Self::guard) makes it a no-op if the
/// token is cancelled before the task is picked up.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Wraps `f` so that it only runs while the token is not cancelled.
    pub fn guard<F>(&self, f: F) -> impl FnOnce() + Send + use<F>
    where
        F: FnOnce() + Send + 'static,
    {
        let token = self.clone();
        move || {
            if !token.is_cancelled() {
                f();
            }
        }
    }

    /// Engine-task variant of [`guard`](Self::guard).
    pub fn guard_engine<S, F>(&self, f: F) -> impl FnOnce(&mut S) + Send + use<S, F>
    where
        S: 'static,
        F: FnOnce(&mut S) + Send + 'static,
    {
        let token = self.clone();
        move |scene: &mut S| {
            if !token.is_cancelled() {
                f(scene);
            }
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Extracts a human-readable message from a panic payload.
pub fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// Runs `f` at a task boundary, logging a panic instead of propagating it.
///
/// Returns `true` if the task completed normally.
pub(crate) fn run_guarded<F: FnOnce()>(executor: &str, seq: u64, f: F) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            log::error!(
                "task #{seq} panicked on executor \"{executor}\": {}",
                panic_payload_to_string(&*payload)
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn fx_task_runs_closure() {
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        FxTask::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
        .run();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn engine_task_mutates_scene() {
        let mut scene = 5i32;
        EngineTask::new(|s: &mut i32| *s *= 2).run(&mut scene);
        assert_eq!(scene, 10);
    }

    #[test]
    fn cancelled_guard_skips_task() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        let task = token.guard(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        token.cancel();
        task();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(token.is_cancelled());
    }

    #[test]
    fn uncancelled_engine_guard_runs() {
        let token = CancelToken::new();
        let task = token.guard_engine(|s: &mut Vec<u8>| s.push(1));
        let mut scene = Vec::new();
        task(&mut scene);
        assert_eq!(scene, vec![1]);
    }

    #[test]
    fn run_guarded_reports_panic() {
        assert!(run_guarded("test", 0, || {}));
        assert!(!run_guarded("test", 1, || panic!("boom")));
    }

    #[test]
    fn payload_messages() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_payload_to_string(&*payload), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_payload_to_string(&*payload), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_payload_to_string(&*payload), "unknown panic payload");
    }
}
