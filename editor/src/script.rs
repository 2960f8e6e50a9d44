//! The editing session played by the headless driver.

use std::time::Duration;

use fernlight_core::abstract_editor::OperationError;

use crate::error::{EditorError, EditorResult};
use crate::operations::{
    AddChildOperation, AddControlOperation, ChangeAppStateOperation, MoveChildOperation,
    PropertyOperation, RemoveChildOperation, RenameNodeOperation,
};
use crate::registry::{ControlKindTag, NodeKindTag};
use crate::scene::{NodeId, PropertyValue, Scene};
use crate::session::EditorSession;

/// App states every scripted scene starts with.
pub const APP_STATES: [&str; 2] = ["physics", "audio"];

/// Builds the scene the script expects.
pub fn initial_scene() -> EditorResult<Scene> {
    let mut scene = Scene::new();
    for name in APP_STATES {
        scene.add_app_state(name, true)?;
    }
    Ok(scene)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    /// Requests posted to the session.
    pub requests: usize,
    /// Undo entries left, most recent first.
    pub undo: Vec<String>,
    /// Redo entries left, next first.
    pub redo: Vec<String>,
}

fn query<R: Send + 'static>(
    session: &EditorSession,
    timeout: Duration,
    f: impl FnOnce(&Scene) -> R + Send + 'static,
) -> EditorResult<R> {
    session
        .inspect(f)
        .recv_timeout(timeout)
        .map_err(|_| EditorError::Timeout(timeout))
}

fn find(session: &EditorSession, timeout: Duration, name: &'static str) -> EditorResult<NodeId> {
    query(session, timeout, move |scene| scene.find(name))?
        .ok_or_else(|| OperationError::TargetNotFound(name.into()).into())
}

/// Plays the scripted edit from a non-UI thread, waiting for the session to
/// settle between steps. Needs a running engine thread and UI toolkit.
pub fn play(session: &EditorSession, timeout: Duration) -> EditorResult<ScriptReport> {
    let mut requests = 0;
    let root = query(session, timeout, Scene::root)?;
    let kind = |tag| {
        session
            .registries()
            .node_kinds
            .create(tag)
            .ok_or_else(|| EditorError::UnknownFactory(format!("{tag:?}")))
    };

    log::info!("Building the scene");
    for (name, tag) in [
        ("Sun", NodeKindTag::DirectionalLight),
        ("Camera", NodeKindTag::Camera),
        ("Props", NodeKindTag::Node),
    ] {
        session.post(Box::new(AddChildOperation::new(root, name, kind(tag)?)));
        requests += 1;
    }
    session.wait_idle(timeout)?;

    let sun = find(session, timeout, "Sun")?;
    let camera = find(session, timeout, "Camera")?;
    let props = find(session, timeout, "Props")?;

    log::info!("Editing");
    session.post(Box::new(RenameNodeOperation::new(sun, "Key Light")));
    // A drag: three steps merge into one undo entry.
    for exposure in [0.25, 0.5, 0.75] {
        session.post(Box::new(PropertyOperation::new(
            camera,
            "exposure",
            Some(PropertyValue::Float(exposure)),
        )));
    }
    let spin = session
        .registries()
        .controls
        .create(ControlKindTag::Rotation)
        .ok_or_else(|| EditorError::UnknownFactory("Rotation".into()))?;
    session.post(Box::new(AddControlOperation::new(props, spin)));
    session.post(Box::new(ChangeAppStateOperation::new("audio", false)));
    session.post(Box::new(MoveChildOperation::new(camera, props)));
    requests += 7;
    session.wait_idle(timeout)?;

    log::info!("Undo twice, redo once");
    session.post_undo();
    session.post_undo();
    session.wait_idle(timeout)?;
    session.post_redo();
    requests += 3;
    session.wait_idle(timeout)?;

    // The root cannot be removed; the failure is logged and captured.
    session.post(Box::new(RemoveChildOperation::new(root)));
    requests += 1;
    session.wait_idle(timeout)?;

    Ok(ScriptReport {
        requests,
        undo: session.undo_descriptions(),
        redo: session.redo_descriptions(),
    })
}
