//! In-memory scene graph owned by the engine thread.
//!
//! The editor core never renders. `Scene` plays the engine's role: a tree
//! of nodes with names, kinds, properties and controls, plus scene-level
//! app states. It is only ever touched through `&mut Scene` inside engine
//! tasks, so none of its methods synchronize.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use fernlight_core::abstract_editor::{Editable, OperationError};
use thiserror::Error;

use crate::changes::ModelChange;

/// Property key advanced by rotation controls.
pub const ROTATION: &str = "rotation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(u32);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "control#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmitterShape {
    Point,
    Box { extents: [f32; 3] },
    Sphere { radius: f32 },
}

/// What a node is. Each variant carries only its own data.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain grouping node.
    Node,
    Geometry { mesh: String },
    Light { light: LightKind, intensity: f32 },
    Camera { fov_degrees: f32 },
    ParticleEmitter { shape: EmitterShape, max_particles: u32 },
    Audio { source: String, volume: f32 },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Node => "Node",
            Self::Geometry { .. } => "Geometry",
            Self::Light { .. } => "Light",
            Self::Camera { .. } => "Camera",
            Self::ParticleEmitter { .. } => "ParticleEmitter",
            Self::Audio { .. } => "Audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Vec3([f32; 3]),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.3}"),
            Self::Vec3([x, y, z]) => write!(f, "({x:.3}, {y:.3}, {z:.3})"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

/// Per-frame behaviour attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    /// Spins the node around its Y axis, in degrees per second.
    Rotation { degrees_per_second: f32 },
    Billboard,
    Animation { clip: String, looping: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub id: ControlId,
    pub kind: ControlKind,
    pub enabled: bool,
}

/// A scene-wide system that can be switched on and off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("{0} does not exist")]
    NodeNotFound(NodeId),
    #[error("{node} has no {control}")]
    ControlNotFound { node: NodeId, control: ControlId },
    #[error("app state \"{0}\" does not exist")]
    AppStateNotFound(String),
    #[error("app state \"{0}\" already exists")]
    DuplicateAppState(String),
    #[error("the root node cannot be detached or re-parented")]
    RootNode,
    #[error("{child} is already attached to {parent}")]
    AlreadyAttached { child: NodeId, parent: NodeId },
    #[error("{0} is not attached to a parent")]
    NotAttached(NodeId),
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },
}

impl From<SceneError> for OperationError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::NodeNotFound(_)
            | SceneError::ControlNotFound { .. }
            | SceneError::AppStateNotFound(_) => Self::TargetNotFound(err.to_string()),
            _ => Self::InvalidState(err.to_string()),
        }
    }
}

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug)]
struct NodeData {
    name: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    properties: BTreeMap<String, PropertyValue>,
    controls: Vec<Control>,
}

/// The engine-side scene graph.
#[derive(Debug)]
pub struct Scene {
    nodes: HashMap<NodeId, NodeData>,
    root: NodeId,
    next_node: u32,
    next_control: u32,
    app_states: Vec<AppState>,
    elapsed: f64,
}

impl Editable for Scene {
    type Change = ModelChange;
}

impl Scene {
    /// Creates a scene containing only the root node.
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            NodeData {
                name: "Root".into(),
                kind: NodeKind::Node,
                parent: None,
                children: Vec::new(),
                properties: BTreeMap::new(),
                controls: Vec::new(),
            },
        );
        Self {
            nodes,
            root,
            next_node: 1,
            next_control: 0,
            app_states: Vec::new(),
            elapsed: 0.0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes, attached or not, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Seconds accumulated by [`update`](Self::update).
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn ensure_node(&self, id: NodeId) -> SceneResult<()> {
        self.node(id).map(|_| ())
    }

    fn node(&self, id: NodeId) -> SceneResult<&NodeData> {
        self.nodes.get(&id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut NodeData> {
        self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Creates a detached node.
    pub fn create_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            NodeData {
                name: name.into(),
                kind,
                parent: None,
                children: Vec::new(),
                properties: BTreeMap::new(),
                controls: Vec::new(),
            },
        );
        id
    }

    /// Checks that `child` could be attached under `parent`, ignoring its
    /// current parent.
    pub fn check_attach(&self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(SceneError::RootNode);
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(SceneError::Cycle { child, parent });
            }
            cursor = self.node(id)?.parent;
        }
        Ok(())
    }

    /// Attaches a detached node at `index` (clamped), or at the end.
    ///
    /// Returns the index the child ended up at.
    pub fn attach_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> SceneResult<usize> {
        self.check_attach(parent, child)?;
        if let Some(current) = self.node(child)?.parent {
            return Err(SceneError::AlreadyAttached {
                child,
                parent: current,
            });
        }
        let children = &mut self.node_mut(parent)?.children;
        let index = index.map_or(children.len(), |i| i.min(children.len()));
        children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(index)
    }

    /// Detaches a node from its parent. The subtree stays intact.
    ///
    /// Returns the former parent and index.
    pub fn detach_child(&mut self, child: NodeId) -> SceneResult<(NodeId, usize)> {
        if child == self.root {
            return Err(SceneError::RootNode);
        }
        let parent = self.node(child)?.parent.ok_or(SceneError::NotAttached(child))?;
        let children = &mut self.node_mut(parent)?.children;
        let index = children
            .iter()
            .position(|&c| c == child)
            .ok_or(SceneError::NotAttached(child))?;
        children.remove(index);
        self.node_mut(child)?.parent = None;
        Ok((parent, index))
    }

    pub fn parent(&self, id: NodeId) -> SceneResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> SceneResult<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// `true` if the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    /// First attached node with the given name, in depth-first order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.nodes.get(&id)?;
            if node.name == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    pub fn name(&self, id: NodeId) -> SceneResult<&str> {
        Ok(&self.node(id)?.name)
    }

    /// Renames a node, returning the previous name.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> SceneResult<String> {
        Ok(std::mem::replace(&mut self.node_mut(id)?.name, name.into()))
    }

    pub fn kind(&self, id: NodeId) -> SceneResult<&NodeKind> {
        Ok(&self.node(id)?.kind)
    }

    pub fn property(&self, id: NodeId, key: &str) -> SceneResult<Option<&PropertyValue>> {
        Ok(self.node(id)?.properties.get(key))
    }

    /// Sets (`Some`) or removes (`None`) a property, returning the old value.
    pub fn set_property(
        &mut self,
        id: NodeId,
        key: &str,
        value: Option<PropertyValue>,
    ) -> SceneResult<Option<PropertyValue>> {
        let properties = &mut self.node_mut(id)?.properties;
        Ok(match value {
            Some(value) => properties.insert(key.to_owned(), value),
            None => properties.remove(key),
        })
    }

    pub fn controls(&self, id: NodeId) -> SceneResult<&[Control]> {
        Ok(&self.node(id)?.controls)
    }

    /// Creates an enabled control and appends it to the node.
    pub fn add_control(&mut self, id: NodeId, kind: ControlKind) -> SceneResult<ControlId> {
        self.node(id)?;
        let control = Control {
            id: ControlId(self.next_control),
            kind,
            enabled: true,
        };
        self.next_control += 1;
        let control_id = control.id;
        self.node_mut(id)?.controls.push(control);
        Ok(control_id)
    }

    /// Re-inserts a control removed earlier, at `index` (clamped) or the end.
    pub fn insert_control(
        &mut self,
        id: NodeId,
        control: Control,
        index: Option<usize>,
    ) -> SceneResult<usize> {
        let controls = &mut self.node_mut(id)?.controls;
        let index = index.map_or(controls.len(), |i| i.min(controls.len()));
        controls.insert(index, control);
        Ok(index)
    }

    /// Removes a control, returning it together with its former index.
    pub fn remove_control(
        &mut self,
        id: NodeId,
        control: ControlId,
    ) -> SceneResult<(Control, usize)> {
        let controls = &mut self.node_mut(id)?.controls;
        let index = controls
            .iter()
            .position(|c| c.id == control)
            .ok_or(SceneError::ControlNotFound { node: id, control })?;
        Ok((controls.remove(index), index))
    }

    pub fn add_app_state(&mut self, name: impl Into<String>, enabled: bool) -> SceneResult<()> {
        let name = name.into();
        if self.app_state(&name).is_some() {
            return Err(SceneError::DuplicateAppState(name));
        }
        self.app_states.push(AppState { name, enabled });
        Ok(())
    }

    pub fn app_state(&self, name: &str) -> Option<&AppState> {
        self.app_states.iter().find(|s| s.name == name)
    }

    pub fn app_states(&self) -> &[AppState] {
        &self.app_states
    }

    /// Enables or disables an app state, returning the previous flag.
    pub fn set_app_state_enabled(&mut self, name: &str, enabled: bool) -> SceneResult<bool> {
        let state = self
            .app_states
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| SceneError::AppStateNotFound(name.to_owned()))?;
        Ok(std::mem::replace(&mut state.enabled, enabled))
    }

    /// Per-frame engine work: advances enabled rotation controls by `tpf`
    /// seconds.
    pub fn update(&mut self, tpf: f32) {
        self.elapsed += f64::from(tpf);
        for node in self.nodes.values_mut() {
            let spin: f32 = node
                .controls
                .iter()
                .filter(|c| c.enabled)
                .filter_map(|c| match c.kind {
                    ControlKind::Rotation { degrees_per_second } => Some(degrees_per_second),
                    _ => None,
                })
                .sum();
            if spin == 0.0 {
                continue;
            }
            let rotation = node
                .properties
                .entry(ROTATION.to_owned())
                .or_insert(PropertyValue::Vec3([0.0; 3]));
            if let PropertyValue::Vec3([_, y, _]) = rotation {
                *y = (*y + spin * tpf).rem_euclid(360.0);
            }
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let Some(node) = self.nodes.get(&id) else {
            return Ok(());
        };
        write!(f, "{:indent$}{} [{}] ({id})", "", node.name, node.kind.label(), indent = depth * 2)?;
        for (key, value) in &node.properties {
            write!(f, " {key}={value}")?;
        }
        if !node.controls.is_empty() {
            write!(f, " controls={}", node.controls.len())?;
        }
        writeln!(f)?;
        for &child in &node.children {
            self.fmt_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints the attached tree followed by the app states.
impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root, 0)?;
        for state in &self.app_states {
            writeln!(
                f,
                "app state {}: {}",
                state.name,
                if state.enabled { "on" } else { "off" }
            )?;
        }
        Ok(())
    }
}
