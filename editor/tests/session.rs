use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

use fernlight_core::abstract_editor::{OperationError, OperationState};
use fernlight_core::{ExecutorConfig, ExecutorManager, HeadlessToolkit, PumpedToolkit};
use fernlight_editor::operations::{
    AddChildOperation, ChangeAppStateOperation, MoveChildOperation, PropertyOperation,
    RemoveChildOperation, RenameNodeOperation,
};
use fernlight_editor::{
    ControlKindTag, EditorError, EditorSession, EmitterShape, EmitterShapeTag, EngineThread,
    ModelChangeConsumer, NodeId, NodeKind, NodeKindTag, PropertyValue, Registries, Scene, script,
};
use parking_lot::Mutex;
use rstest::rstest;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn small_config() -> ExecutorConfig {
    let mut config = ExecutorConfig::default();
    config.background.executors = 1;
    config.background.pool_threads = 2;
    config
}

/// Records the hooks it sees as short strings.
#[derive(Default)]
struct Outline {
    events: Mutex<Vec<String>>,
}

impl Outline {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl ModelChangeConsumer for Outline {
    fn notify_added_child(&self, parent: NodeId, child: NodeId, index: usize) {
        self.events.lock().push(format!("add {child} to {parent} at {index}"));
    }

    fn notify_removed_child(&self, parent: NodeId, child: NodeId, index: usize) {
        self.events.lock().push(format!("remove {child} from {parent} at {index}"));
    }

    fn notify_moved_child(&self, child: NodeId, _old: NodeId, new_parent: NodeId, index: usize) {
        self.events.lock().push(format!("move {child} to {new_parent} at {index}"));
    }

    fn notify_changed_property(
        &self,
        node: NodeId,
        key: &str,
        _old: Option<&PropertyValue>,
        new: Option<&PropertyValue>,
    ) {
        self.events.lock().push(format!("{node}.{key} = {new:?}"));
    }

    fn notify_renamed(&self, node: NodeId, _old: &str, new: &str) {
        self.events.lock().push(format!("rename {node} {new}"));
    }
}

/// Session on a pumped UI thread (the test thread) with a scene ticked by
/// hand.
struct Harness {
    manager: ExecutorManager<Scene>,
    toolkit: Arc<PumpedToolkit>,
    session: EditorSession,
    outline: Arc<Outline>,
    scene: Scene,
}

impl Harness {
    fn new() -> Self {
        init_logging();
        let manager = ExecutorManager::new(small_config()).unwrap();
        let toolkit = Arc::new(PumpedToolkit::new());
        manager.attach_ui_toolkit(toolkit.clone());
        let session = EditorSession::new(manager.clone(), Registries::default(), 50);
        let outline = Arc::new(Outline::default());
        session.notifier().add_listener(outline.clone());
        let mut scene = Scene::new();
        scene.add_app_state("physics", true).unwrap();
        Self {
            manager,
            toolkit,
            session,
            outline,
            scene,
        }
    }

    fn root(&self) -> NodeId {
        self.scene.root()
    }

    fn settle(&mut self) {
        for _ in 0..32 {
            let ticked = self.manager.engine_tick(&mut self.scene);
            let pumped = self.toolkit.pump();
            if ticked == 0 && pumped == 0 {
                break;
            }
        }
        assert!(self.session.is_idle());
    }

    fn add(&mut self, name: &str) -> NodeId {
        let handle = self
            .session
            .execute(Box::new(AddChildOperation::new(self.root(), name, NodeKind::Node)))
            .unwrap();
        self.settle();
        AddChildOperation::created_in(&handle).unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.manager.shutdown();
    }
}

#[test]
fn create_node_undo_redo_keeps_identity() {
    let mut h = Harness::new();
    let root = h.root();
    let handle = h.session.create_node(root, NodeKindTag::Camera, "Camera").unwrap();
    assert_eq!(handle.state(), OperationState::Mutating(fernlight_core::abstract_editor::Direction::Redo));
    h.settle();

    let camera = AddChildOperation::created_in(&handle).unwrap();
    assert_eq!(h.scene.kind(camera).unwrap(), &NodeKind::Camera { fov_degrees: 45.0 });
    assert_eq!(h.outline.take(), vec![format!("add {camera} to {root} at 0")]);

    h.session.undo().unwrap().unwrap();
    h.settle();
    assert!(!h.scene.is_attached(camera));
    h.session.redo().unwrap().unwrap();
    h.settle();

    assert_eq!(h.scene.children(root).unwrap(), &[camera]);
    assert_eq!(
        h.outline.take(),
        vec![
            format!("remove {camera} from {root} at 0"),
            format!("add {camera} to {root} at 0"),
        ]
    );
    assert_eq!(handle.state(), OperationState::Applied);
}

#[test]
fn property_drag_is_one_undo_step() {
    let mut h = Harness::new();
    let node = h.add("Box");
    h.outline.take();

    for value in [1.0, 2.0, 3.0] {
        h.session
            .execute(Box::new(PropertyOperation::new(
                node,
                "scale",
                Some(PropertyValue::Float(value)),
            )))
            .unwrap();
        h.settle();
    }
    assert_eq!(h.session.history_len(), 2);
    assert_eq!(h.session.undo_descriptions()[0], "Change scale");
    assert_eq!(
        h.scene.property(node, "scale").unwrap(),
        Some(&PropertyValue::Float(3.0))
    );

    h.session.undo().unwrap();
    h.settle();
    assert_eq!(h.scene.property(node, "scale").unwrap(), None);
    assert_eq!(h.outline.take().last().unwrap(), &format!("{node}.scale = None"));
}

#[test]
fn undo_while_redo_in_flight_is_rejected() {
    let mut h = Harness::new();
    let node = h.add("Lamp");
    h.session
        .execute(Box::new(RenameNodeOperation::new(node, "Key")))
        .unwrap();

    let err = h.session.undo().unwrap_err();
    assert!(matches!(
        err,
        EditorError::Operation(OperationError::OutOfOrder { .. })
    ));
    assert!(h.session.can_undo());

    h.settle();
    h.session.undo().unwrap();
    h.settle();
    assert_eq!(h.scene.name(node).unwrap(), "Lamp");
}

#[test]
fn failed_remove_skips_notification_and_settles() {
    let mut h = Harness::new();
    let node = h.add("Orphan");
    h.session
        .execute(Box::new(RemoveChildOperation::new(node)))
        .unwrap();
    h.settle();
    h.outline.take();

    let handle = h
        .session
        .execute(Box::new(RemoveChildOperation::new(node)))
        .unwrap();
    h.settle();

    assert_eq!(handle.state(), OperationState::Applied);
    assert!(matches!(
        handle.last_error(),
        Some(OperationError::InvalidState(_))
    ));
    assert!(h.outline.take().is_empty());
}

#[test]
fn move_and_app_state_round_trip() {
    let mut h = Harness::new();
    let root = h.root();
    let group = h.add("Group");
    let lamp = h.add("Lamp");
    h.outline.take();

    h.session
        .execute(Box::new(MoveChildOperation::new(lamp, group)))
        .unwrap();
    h.session
        .execute(Box::new(ChangeAppStateOperation::new("physics", false)))
        .unwrap();
    h.settle();
    assert_eq!(h.scene.parent(lamp).unwrap(), Some(group));
    assert!(!h.scene.app_state("physics").unwrap().enabled);
    assert_eq!(h.outline.take(), vec![format!("move {lamp} to {group} at 0")]);

    h.session.undo().unwrap();
    h.settle();
    h.session.undo().unwrap();
    h.settle();
    assert_eq!(h.scene.children(root).unwrap(), &[group, lamp]);
    assert!(h.scene.app_state("physics").unwrap().enabled);
    assert!(h.session.can_redo());
    assert_eq!(h.session.redo_descriptions(), vec!["Move child", "Disable physics"]);
}

#[test]
fn add_control_from_registry() {
    let mut h = Harness::new();
    let node = h.add("Spinner");
    h.session.add_control(node, ControlKindTag::Rotation).unwrap();
    h.settle();
    h.scene.update(1.0);
    assert_eq!(
        h.scene.property(node, "rotation").unwrap(),
        Some(&PropertyValue::Vec3([0.0, 45.0, 0.0]))
    );
}

#[test]
fn create_emitter_uses_shape_registry() {
    let mut h = Harness::new();
    let root = h.root();
    let handle = h
        .session
        .create_emitter(root, EmitterShapeTag::Sphere, 250, "Sparks")
        .unwrap();
    h.settle();

    let sparks = AddChildOperation::created_in(&handle).unwrap();
    assert_eq!(
        h.scene.kind(sparks).unwrap(),
        &NodeKind::ParticleEmitter {
            shape: EmitterShape::Sphere { radius: 1.0 },
            max_particles: 250,
        }
    );
    assert_eq!(h.session.undo_descriptions(), vec!["Add child"]);
}

#[test]
fn execute_after_shutdown_is_rejected() {
    let mut h = Harness::new();
    let node = h.add("Late");
    h.manager.shutdown();

    let err = h
        .session
        .execute(Box::new(RenameNodeOperation::new(node, "Too late")))
        .unwrap_err();
    assert!(matches!(err, EditorError::Operation(OperationError::ShutDown)));
    assert!(matches!(
        h.session.undo().unwrap_err(),
        EditorError::Operation(OperationError::ShutDown)
    ));
    assert_eq!(h.session.history_len(), 1);
    assert!(h.session.is_idle());
    h.settle();
    assert_eq!(h.scene.name(node).unwrap(), "Late");
}

#[test]
fn saved_state_tracking() {
    let mut h = Harness::new();
    let node = h.add("Doc");
    h.session.mark_saved();
    assert!(!h.session.has_unsaved_changes());

    h.session
        .execute(Box::new(RenameNodeOperation::new(node, "Doc v2")))
        .unwrap();
    h.settle();
    assert!(h.session.has_unsaved_changes());
    h.session.undo().unwrap();
    h.settle();
    assert!(!h.session.has_unsaved_changes());
}

#[rstest]
#[case(1, 10)]
#[case(4, 25)]
fn posts_from_many_threads_keep_per_thread_order(#[case] threads: usize, #[case] per_thread: usize) {
    let mut h = Harness::new();
    let root = h.root();

    let producers: Vec<_> = (0..threads)
        .map(|t| {
            let session = h.session.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    session.post(Box::new(AddChildOperation::new(
                        root,
                        format!("{t}-{i}"),
                        NodeKind::Node,
                    )));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    h.settle();

    let names: Vec<String> = h
        .scene
        .children(root)
        .unwrap()
        .iter()
        .map(|&id| h.scene.name(id).unwrap().to_owned())
        .collect();
    assert_eq!(names.len(), threads * per_thread);
    assert_eq!(h.session.history_len(), (threads * per_thread).min(50));
    for t in 0..threads {
        let order: Vec<usize> = names
            .iter()
            .filter_map(|name| name.strip_prefix(&format!("{t}-")))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(order, (0..per_thread).collect::<Vec<_>>());
    }
}

#[test]
fn scripted_session_on_real_threads() {
    init_logging();
    let manager = ExecutorManager::<Scene>::new(small_config()).unwrap();
    manager.attach_ui_toolkit(Arc::new(HeadlessToolkit::spawn("fx-test").unwrap()));
    let session = EditorSession::new(manager.clone(), Registries::default(), 100);
    let engine = EngineThread::spawn(
        manager.clone(),
        script::initial_scene().unwrap(),
        Duration::from_millis(1),
    )
    .unwrap();

    let report = script::play(&session, Duration::from_secs(10)).unwrap();
    let scene = engine.stop().unwrap();
    manager.shutdown();

    assert_eq!(report.requests, 14);
    assert_eq!(
        report.undo,
        vec![
            "Remove child",
            "Disable audio",
            "Add control",
            "Change exposure",
            "Rename node",
            "Add child",
            "Add child",
            "Add child",
        ]
    );
    assert!(report.redo.is_empty());

    let root = scene.root();
    let light = scene.find("Key Light").unwrap();
    let camera = scene.find("Camera").unwrap();
    let props = scene.find("Props").unwrap();
    assert_eq!(scene.children(root).unwrap(), &[light, camera, props]);
    assert_eq!(
        scene.property(camera, "exposure").unwrap(),
        Some(&PropertyValue::Float(0.75))
    );
    assert!(!scene.app_state("audio").unwrap().enabled);
    assert!(scene.app_state("physics").unwrap().enabled);
    assert_eq!(scene.controls(props).unwrap().len(), 1);
}
