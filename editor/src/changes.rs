//! Scene change records and their fan-out to UI-side listeners.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use fernlight_core::abstract_editor::ChangeConsumer;
use fernlight_core::panic_payload_to_string;
use parking_lot::RwLock;

use crate::scene::{ControlId, ControlKind, NodeId, PropertyValue, Scene};

/// One observable effect of an operation on the scene.
///
/// Recorded on the engine thread and delivered on the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChange {
    AddedChild {
        parent: NodeId,
        child: NodeId,
        index: usize,
    },
    RemovedChild {
        parent: NodeId,
        child: NodeId,
        index: usize,
    },
    MovedChild {
        child: NodeId,
        old_parent: NodeId,
        new_parent: NodeId,
        index: usize,
    },
    ChangedProperty {
        node: NodeId,
        key: String,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    },
    Renamed {
        node: NodeId,
        old: String,
        new: String,
    },
    AddedControl {
        node: NodeId,
        control: ControlId,
        kind: ControlKind,
    },
    RemovedControl {
        node: NodeId,
        control: ControlId,
    },
    ChangedAppState {
        name: String,
        enabled: bool,
    },
}

/// UI-side listener for scene changes. Every hook defaults to a no-op.
pub trait ModelChangeConsumer: Send + Sync {
    fn notify_added_child(&self, _parent: NodeId, _child: NodeId, _index: usize) {}

    fn notify_removed_child(&self, _parent: NodeId, _child: NodeId, _index: usize) {}

    fn notify_moved_child(
        &self,
        _child: NodeId,
        _old_parent: NodeId,
        _new_parent: NodeId,
        _index: usize,
    ) {
    }

    fn notify_changed_property(
        &self,
        _node: NodeId,
        _key: &str,
        _old: Option<&PropertyValue>,
        _new: Option<&PropertyValue>,
    ) {
    }

    fn notify_renamed(&self, _node: NodeId, _old: &str, _new: &str) {}

    fn notify_added_control(&self, _node: NodeId, _control: ControlId, _kind: &ControlKind) {}

    fn notify_removed_control(&self, _node: NodeId, _control: ControlId) {}

    fn notify_changed_app_state(&self, _name: &str, _enabled: bool) {}
}

fn dispatch(listener: &dyn ModelChangeConsumer, change: &ModelChange) {
    match change {
        ModelChange::AddedChild {
            parent,
            child,
            index,
        } => listener.notify_added_child(*parent, *child, *index),
        ModelChange::RemovedChild {
            parent,
            child,
            index,
        } => listener.notify_removed_child(*parent, *child, *index),
        ModelChange::MovedChild {
            child,
            old_parent,
            new_parent,
            index,
        } => listener.notify_moved_child(*child, *old_parent, *new_parent, *index),
        ModelChange::ChangedProperty {
            node,
            key,
            old,
            new,
        } => listener.notify_changed_property(*node, key, old.as_ref(), new.as_ref()),
        ModelChange::Renamed { node, old, new } => listener.notify_renamed(*node, old, new),
        ModelChange::AddedControl {
            node,
            control,
            kind,
        } => listener.notify_added_control(*node, *control, kind),
        ModelChange::RemovedControl { node, control } => {
            listener.notify_removed_control(*node, *control)
        }
        ModelChange::ChangedAppState { name, enabled } => {
            listener.notify_changed_app_state(name, *enabled)
        }
    }
}

/// Fans scene changes out to registered listeners.
///
/// This is the [`ChangeConsumer`] handed to every operation pipeline. A
/// panicking listener is logged and does not stop later listeners from
/// seeing the same change.
#[derive(Default)]
pub struct ModelNotifier {
    listeners: RwLock<Vec<Arc<dyn ModelChangeConsumer>>>,
}

impl ModelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn ModelChangeConsumer>) {
        self.listeners.write().push(listener);
    }

    /// Removes a listener previously added, compared by pointer.
    pub fn remove_listener(&self, listener: &Arc<dyn ModelChangeConsumer>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn publish(&self, change: &ModelChange) {
        // Snapshot so listeners may register others while being notified.
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| dispatch(&*listener, change))) {
                log::error!(
                    "Model listener panicked on {change:?}: {}",
                    panic_payload_to_string(payload.as_ref())
                );
            }
        }
    }
}

impl ChangeConsumer<Scene> for ModelNotifier {
    fn notify_change(&self, change: &ModelChange) {
        self.publish(change);
    }
}

impl std::fmt::Debug for ModelNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Listener that logs every change at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl ModelChangeConsumer for LoggingListener {
    fn notify_added_child(&self, parent: NodeId, child: NodeId, index: usize) {
        log::debug!("added {child} to {parent} at {index}");
    }

    fn notify_removed_child(&self, parent: NodeId, child: NodeId, index: usize) {
        log::debug!("removed {child} from {parent} at {index}");
    }

    fn notify_moved_child(&self, child: NodeId, old_parent: NodeId, new_parent: NodeId, index: usize) {
        log::debug!("moved {child} from {old_parent} to {new_parent} at {index}");
    }

    fn notify_changed_property(
        &self,
        node: NodeId,
        key: &str,
        old: Option<&PropertyValue>,
        new: Option<&PropertyValue>,
    ) {
        log::debug!("{node}.{key}: {old:?} -> {new:?}");
    }

    fn notify_renamed(&self, node: NodeId, old: &str, new: &str) {
        log::debug!("renamed {node} from {old:?} to {new:?}");
    }

    fn notify_added_control(&self, node: NodeId, control: ControlId, kind: &ControlKind) {
        log::debug!("added {control} ({kind:?}) to {node}");
    }

    fn notify_removed_control(&self, node: NodeId, control: ControlId) {
        log::debug!("removed {control} from {node}");
    }

    fn notify_changed_app_state(&self, name: &str, enabled: bool) {
        log::debug!("app state {name} enabled={enabled}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Outline {
        events: Mutex<Vec<String>>,
    }

    impl ModelChangeConsumer for Outline {
        fn notify_added_child(&self, parent: NodeId, child: NodeId, index: usize) {
            self.events.lock().push(format!("add {child} {parent} {index}"));
        }

        fn notify_renamed(&self, node: NodeId, _old: &str, new: &str) {
            self.events.lock().push(format!("rename {node} {new}"));
        }
    }

    struct Exploding;

    impl ModelChangeConsumer for Exploding {
        fn notify_renamed(&self, _node: NodeId, _old: &str, _new: &str) {
            panic!("listener bug");
        }
    }

    fn ids() -> (NodeId, NodeId) {
        let mut scene = Scene::new();
        let child = scene.create_node("Child", crate::scene::NodeKind::Node);
        (scene.root(), child)
    }

    #[test]
    fn publish_routes_to_matching_hook() {
        let (root, child) = ids();
        let notifier = ModelNotifier::new();
        let outline = Arc::new(Outline::default());
        notifier.add_listener(outline.clone());

        notifier.notify_change(&ModelChange::AddedChild {
            parent: root,
            child,
            index: 0,
        });
        notifier.notify_change(&ModelChange::ChangedAppState {
            name: "physics".into(),
            enabled: false,
        });

        assert_eq!(
            *outline.events.lock(),
            vec![format!("add {child} {root} 0")]
        );
    }

    #[test]
    fn panicking_listener_does_not_starve_others() {
        let (_, child) = ids();
        let notifier = ModelNotifier::new();
        let outline = Arc::new(Outline::default());
        notifier.add_listener(Arc::new(Exploding));
        notifier.add_listener(outline.clone());

        notifier.publish(&ModelChange::Renamed {
            node: child,
            old: "Child".into(),
            new: "Lamp".into(),
        });

        assert_eq!(*outline.events.lock(), vec![format!("rename {child} Lamp")]);
    }

    #[test]
    fn remove_listener_by_pointer() {
        let notifier = ModelNotifier::new();
        let listener: Arc<dyn ModelChangeConsumer> = Arc::new(LoggingListener);
        notifier.add_listener(listener.clone());
        assert_eq!(notifier.listener_count(), 1);
        assert!(notifier.remove_listener(&listener));
        assert!(!notifier.remove_listener(&listener));
        assert_eq!(notifier.listener_count(), 0);
    }
}
