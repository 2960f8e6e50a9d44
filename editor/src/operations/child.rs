use fernlight_core::abstract_editor::{EditorOperation, OperationHandle, OperationResult};

use super::not_applied;
use crate::changes::ModelChange;
use crate::scene::{NodeId, NodeKind, Scene};

/// Creates a node and attaches it under `parent`.
///
/// The node is created on the first redo; later redos re-attach the same
/// node, so listeners see a stable id across undo and redo.
#[derive(Debug)]
pub struct AddChildOperation {
    parent: NodeId,
    name: String,
    kind: NodeKind,
    index: Option<usize>,
    created: Option<NodeId>,
}

impl AddChildOperation {
    pub fn new(parent: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            parent,
            name: name.into(),
            kind,
            index: None,
            created: None,
        }
    }

    /// Inserts at `index` instead of appending.
    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Attaches an existing detached node instead of creating one.
    pub fn existing(parent: NodeId, child: NodeId) -> Self {
        Self {
            parent,
            name: String::new(),
            kind: NodeKind::Node,
            index: None,
            created: Some(child),
        }
    }

    pub fn created(&self) -> Option<NodeId> {
        self.created
    }

    /// The node created by an add operation held in `handle`, once its first
    /// redo has run.
    pub fn created_in(handle: &OperationHandle<Scene>) -> Option<NodeId> {
        handle.with_operation(|op| {
            let op: &dyn EditorOperation<Scene> = op;
            op.as_any()
                .downcast_ref::<Self>()
                .and_then(|add| add.created)
        })
    }
}

impl EditorOperation<Scene> for AddChildOperation {
    fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let child = match self.created {
            Some(child) => child,
            None => {
                scene.ensure_node(self.parent)?;
                let child = scene.create_node(self.name.clone(), self.kind.clone());
                self.created = Some(child);
                child
            }
        };
        let index = scene.attach_child(self.parent, child, self.index)?;
        changes.push(ModelChange::AddedChild {
            parent: self.parent,
            child,
            index,
        });
        Ok(())
    }

    fn undo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let child = self.created.ok_or_else(|| not_applied(self.description()))?;
        let (parent, index) = scene.detach_child(child)?;
        changes.push(ModelChange::RemovedChild {
            parent,
            child,
            index,
        });
        Ok(())
    }

    fn description(&self) -> &str {
        "Add child"
    }
}

/// Detaches a node from its parent, keeping the subtree for undo.
#[derive(Debug)]
pub struct RemoveChildOperation {
    child: NodeId,
    removed_from: Option<(NodeId, usize)>,
}

impl RemoveChildOperation {
    pub fn new(child: NodeId) -> Self {
        Self {
            child,
            removed_from: None,
        }
    }
}

impl EditorOperation<Scene> for RemoveChildOperation {
    fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let (parent, index) = scene.detach_child(self.child)?;
        self.removed_from = Some((parent, index));
        changes.push(ModelChange::RemovedChild {
            parent,
            child: self.child,
            index,
        });
        Ok(())
    }

    fn undo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let (parent, index) = self
            .removed_from
            .ok_or_else(|| not_applied(self.description()))?;
        let index = scene.attach_child(parent, self.child, Some(index))?;
        changes.push(ModelChange::AddedChild {
            parent,
            child: self.child,
            index,
        });
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove child"
    }

    fn notify_on_failure(&self) -> bool {
        false
    }
}

/// Re-parents a node, optionally at a given index.
#[derive(Debug)]
pub struct MoveChildOperation {
    child: NodeId,
    new_parent: NodeId,
    index: Option<usize>,
    previous: Option<(NodeId, usize)>,
}

impl MoveChildOperation {
    pub fn new(child: NodeId, new_parent: NodeId) -> Self {
        Self {
            child,
            new_parent,
            index: None,
            previous: None,
        }
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl EditorOperation<Scene> for MoveChildOperation {
    fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        // Validate first so a rejected move leaves the node where it was.
        scene.check_attach(self.new_parent, self.child)?;
        let (old_parent, old_index) = scene.detach_child(self.child)?;
        self.previous = Some((old_parent, old_index));
        let index = scene.attach_child(self.new_parent, self.child, self.index)?;
        changes.push(ModelChange::MovedChild {
            child: self.child,
            old_parent,
            new_parent: self.new_parent,
            index,
        });
        Ok(())
    }

    fn undo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let (old_parent, old_index) = self
            .previous
            .ok_or_else(|| not_applied(self.description()))?;
        let (current, _) = scene.detach_child(self.child)?;
        let index = scene.attach_child(old_parent, self.child, Some(old_index))?;
        changes.push(ModelChange::MovedChild {
            child: self.child,
            old_parent: current,
            new_parent: old_parent,
            index,
        });
        Ok(())
    }

    fn description(&self) -> &str {
        "Move child"
    }
}
