//! Editor session: history, operation queue and change fan-out over one
//! executor manager.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use fernlight_core::ExecutorManager;
use fernlight_core::abstract_editor::{
    ChangeConsumer, EditorOperation, OperationContext, OperationHandle, OperationHistory,
    OperationQueue,
};
use parking_lot::Mutex;

use crate::changes::ModelNotifier;
use crate::error::{EditorError, EditorResult};
use crate::operations::{AddChildOperation, AddControlOperation};
use crate::registry::{ControlKindTag, EmitterShapeTag, NodeKindTag, Registries};
use crate::scene::{NodeId, Scene};

/// One open document in the editor.
///
/// [`execute`](Self::execute), [`undo`](Self::undo) and [`redo`](Self::redo)
/// belong on the UI thread. Other threads use [`post`](Self::post),
/// [`post_undo`](Self::post_undo) and [`post_redo`](Self::post_redo), which
/// hand the request to the UI thread. Clones share the same session.
#[derive(Clone)]
pub struct EditorSession {
    manager: ExecutorManager<Scene>,
    notifier: Arc<ModelNotifier>,
    ctx: OperationContext<Scene>,
    history: Arc<Mutex<OperationHistory<Scene>>>,
    queue: Arc<OperationQueue<Scene>>,
    registries: Arc<Registries>,
    in_flight: Arc<AtomicUsize>,
    // Merged and non-recorded operations are not in the history.
    last_started: Arc<Mutex<Option<OperationHandle<Scene>>>>,
}

impl EditorSession {
    pub fn new(manager: ExecutorManager<Scene>, registries: Registries, max_undo: usize) -> Self {
        let notifier = Arc::new(ModelNotifier::new());
        let consumer: Arc<dyn ChangeConsumer<Scene>> = notifier.clone();
        Self {
            ctx: OperationContext::new(manager.clone(), consumer),
            manager,
            notifier,
            history: Arc::new(Mutex::new(OperationHistory::new(max_undo))),
            queue: Arc::new(OperationQueue::new()),
            registries: Arc::new(registries),
            in_flight: Arc::new(AtomicUsize::new(0)),
            last_started: Arc::new(Mutex::new(None)),
        }
    }

    pub fn manager(&self) -> &ExecutorManager<Scene> {
        &self.manager
    }

    /// Register UI-side listeners here.
    pub fn notifier(&self) -> &Arc<ModelNotifier> {
        &self.notifier
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn context(&self) -> &OperationContext<Scene> {
        &self.ctx
    }

    /// Runs an operation through the history. UI thread only.
    pub fn execute(
        &self,
        operation: Box<dyn EditorOperation<Scene>>,
    ) -> EditorResult<OperationHandle<Scene>> {
        if !self.manager.is_fx_thread() {
            log::warn!(
                "\"{}\" executed off the UI thread; use post() instead",
                operation.description()
            );
        }
        let handle = self.history.lock().execute(operation, &self.ctx)?;
        Ok(self.started(handle))
    }

    fn started(&self, handle: OperationHandle<Scene>) -> OperationHandle<Scene> {
        *self.last_started.lock() = Some(handle.clone());
        handle
    }

    /// Undoes the last entry. `Ok(None)` when there is nothing to undo.
    pub fn undo(&self) -> EditorResult<Option<OperationHandle<Scene>>> {
        let handle = self.history.lock().undo_last(&self.ctx)?;
        Ok(handle.map(|h| self.started(h)))
    }

    /// Redoes the next entry. `Ok(None)` when there is nothing to redo.
    pub fn redo(&self) -> EditorResult<Option<OperationHandle<Scene>>> {
        let handle = self.history.lock().redo_next(&self.ctx)?;
        Ok(handle.map(|h| self.started(h)))
    }

    /// Queues an operation from any thread; it executes on the UI thread in
    /// submission order.
    pub fn post(&self, operation: Box<dyn EditorOperation<Scene>>) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if self.queue.push(operation) {
            let session = self.clone();
            self.manager.add_fx_task(move || {
                session.drain_posted();
            });
        }
    }

    /// Executes every queued operation. Returns how many ran.
    pub fn drain_posted(&self) -> usize {
        let operations = self.queue.drain();
        let count = operations.len();
        for operation in operations {
            let description = operation.description().to_owned();
            if let Err(err) = self.execute(operation) {
                log::error!("Posted operation \"{description}\" failed: {err}");
            }
        }
        self.in_flight.fetch_sub(count, Ordering::AcqRel);
        count
    }

    /// Requests an undo on the UI thread.
    pub fn post_undo(&self) {
        self.post_command("undo", Self::undo);
    }

    /// Requests a redo on the UI thread.
    pub fn post_redo(&self) {
        self.post_command("redo", Self::redo);
    }

    fn post_command(
        &self,
        name: &'static str,
        command: fn(&Self) -> EditorResult<Option<OperationHandle<Scene>>>,
    ) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let session = self.clone();
        self.manager.add_fx_task(move || {
            match command(&session) {
                Ok(Some(handle)) => log::debug!("{name}: {}", handle.description()),
                Ok(None) => log::debug!("nothing to {name}"),
                Err(err) => log::warn!("{name} rejected: {err}"),
            }
            session.in_flight.fetch_sub(1, Ordering::AcqRel);
        });
    }

    /// Adds a node of a registered kind under `parent`.
    pub fn create_node(
        &self,
        parent: NodeId,
        kind: NodeKindTag,
        name: impl Into<String>,
    ) -> EditorResult<OperationHandle<Scene>> {
        let kind = self
            .registries
            .node_kinds
            .create(kind)
            .ok_or_else(|| EditorError::UnknownFactory(format!("{kind:?}")))?;
        self.execute(Box::new(AddChildOperation::new(parent, name, kind)))
    }

    /// Adds a particle emitter with a registered shape under `parent`.
    pub fn create_emitter(
        &self,
        parent: NodeId,
        shape: EmitterShapeTag,
        max_particles: u32,
        name: impl Into<String>,
    ) -> EditorResult<OperationHandle<Scene>> {
        let kind = self
            .registries
            .emitter(shape, max_particles)
            .ok_or_else(|| EditorError::UnknownFactory(format!("{shape:?}")))?;
        self.execute(Box::new(AddChildOperation::new(parent, name, kind)))
    }

    /// Adds a control of a registered kind to `node`.
    pub fn add_control(
        &self,
        node: NodeId,
        kind: ControlKindTag,
    ) -> EditorResult<OperationHandle<Scene>> {
        let kind = self
            .registries
            .controls
            .create(kind)
            .ok_or_else(|| EditorError::UnknownFactory(format!("{kind:?}")))?;
        self.execute(Box::new(AddControlOperation::new(node, kind)))
    }

    /// Reads the scene on the engine thread. The answer arrives on the
    /// returned channel after the next engine tick.
    pub fn inspect<R, F>(&self, f: F) -> mpsc::Receiver<R>
    where
        R: Send + 'static,
        F: FnOnce(&Scene) -> R + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        self.manager.add_engine_task(move |scene| {
            // The caller may have stopped listening.
            let _ = sender.send(f(scene));
        });
        receiver
    }

    /// No posted request is pending and every history entry has settled.
    pub fn is_idle(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) == 0
            && self.queue.is_empty()
            && self
                .last_started
                .lock()
                .as_ref()
                .is_none_or(OperationHandle::is_settled)
            && self.history.lock().is_settled()
    }

    /// Polls until [`is_idle`](Self::is_idle). Never call this on the UI
    /// thread of a pumped toolkit: nothing would pump it.
    pub fn wait_idle(&self, timeout: Duration) -> EditorResult<()> {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            if Instant::now() >= deadline {
                return Err(EditorError::Timeout(timeout));
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.lock().can_redo()
    }

    /// Undo entries, most recent first.
    pub fn undo_descriptions(&self) -> Vec<String> {
        self.history
            .lock()
            .undo_descriptions()
            .map(str::to_owned)
            .collect()
    }

    pub fn redo_descriptions(&self) -> Vec<String> {
        self.history
            .lock()
            .redo_descriptions()
            .map(str::to_owned)
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn mark_saved(&self) {
        self.history.lock().mark_saved();
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.history.lock().has_unsaved_changes()
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("history", &*self.history.lock())
            .field("queued", &self.queue.len())
            .field("listeners", &self.notifier.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FactoryRegistry;
    use fernlight_core::ExecutorConfig;

    #[test]
    fn unregistered_kind_is_reported() {
        let manager = ExecutorManager::<Scene>::new(ExecutorConfig::default()).unwrap();
        let registries = Registries {
            node_kinds: FactoryRegistry::new(),
            ..Registries::default()
        };
        let session = EditorSession::new(manager.clone(), registries, 10);
        let root = Scene::new().root();
        let err = session.create_node(root, NodeKindTag::Camera, "cam").unwrap_err();
        assert!(matches!(err, EditorError::UnknownFactory(name) if name == "Camera"));
        assert_eq!(session.history_len(), 0);
        assert!(session.is_idle());
        manager.shutdown();
    }

    #[test]
    fn unregistered_emitter_shape_is_reported() {
        let manager = ExecutorManager::<Scene>::new(ExecutorConfig::default()).unwrap();
        let registries = Registries {
            emitter_shapes: FactoryRegistry::new(),
            ..Registries::default()
        };
        let session = EditorSession::new(manager.clone(), registries, 10);
        let root = Scene::new().root();
        let err = session
            .create_emitter(root, EmitterShapeTag::Box, 100, "Sparks")
            .unwrap_err();
        assert!(matches!(err, EditorError::UnknownFactory(name) if name == "Box"));
        assert_eq!(session.history_len(), 0);
        manager.shutdown();
    }
}
