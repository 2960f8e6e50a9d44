use fernlight_core::abstract_editor::{EditorOperation, OperationResult};

use super::not_applied;
use crate::changes::ModelChange;
use crate::scene::{Control, ControlId, ControlKind, NodeId, Scene};

/// Adds a control to a node. Redo after undo re-inserts the same control.
#[derive(Debug)]
pub struct AddControlOperation {
    node: NodeId,
    kind: ControlKind,
    added: Option<(Control, usize)>,
}

impl AddControlOperation {
    pub fn new(node: NodeId, kind: ControlKind) -> Self {
        Self {
            node,
            kind,
            added: None,
        }
    }

    pub fn control(&self) -> Option<ControlId> {
        self.added.as_ref().map(|(control, _)| control.id)
    }
}

impl EditorOperation<Scene> for AddControlOperation {
    fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let control = match &self.added {
            Some((control, index)) => {
                // Kept until the insert succeeds so a failed redo can be retried.
                let control = control.clone();
                let index = scene.insert_control(self.node, control.clone(), Some(*index))?;
                let id = control.id;
                self.added = Some((control, index));
                id
            }
            None => {
                let id = scene.add_control(self.node, self.kind.clone())?;
                let index = scene.controls(self.node)?.len().saturating_sub(1);
                let control = Control {
                    id,
                    kind: self.kind.clone(),
                    enabled: true,
                };
                self.added = Some((control, index));
                id
            }
        };
        changes.push(ModelChange::AddedControl {
            node: self.node,
            control,
            kind: self.kind.clone(),
        });
        Ok(())
    }

    fn undo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let control = self.control().ok_or_else(|| not_applied(self.description()))?;
        let (removed, index) = scene.remove_control(self.node, control)?;
        self.added = Some((removed, index));
        changes.push(ModelChange::RemovedControl {
            node: self.node,
            control,
        });
        Ok(())
    }

    fn description(&self) -> &str {
        "Add control"
    }
}

/// Removes a control from a node, keeping it for undo.
#[derive(Debug)]
pub struct RemoveControlOperation {
    node: NodeId,
    control: ControlId,
    removed: Option<(Control, usize)>,
}

impl RemoveControlOperation {
    pub fn new(node: NodeId, control: ControlId) -> Self {
        Self {
            node,
            control,
            removed: None,
        }
    }
}

impl EditorOperation<Scene> for RemoveControlOperation {
    fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let removed = scene.remove_control(self.node, self.control)?;
        self.removed = Some(removed);
        changes.push(ModelChange::RemovedControl {
            node: self.node,
            control: self.control,
        });
        Ok(())
    }

    fn undo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let (control, index) = self
            .removed
            .clone()
            .ok_or_else(|| not_applied(self.description()))?;
        let kind = control.kind.clone();
        scene.insert_control(self.node, control, Some(index))?;
        self.removed = None;
        changes.push(ModelChange::AddedControl {
            node: self.node,
            control: self.control,
            kind,
        });
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove control"
    }

    fn notify_on_failure(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::{redo, undo};
    use crate::scene::NodeKind;

    #[test]
    fn add_control_keeps_id_across_redo() {
        let mut scene = Scene::new();
        let node = scene.create_node("Spinner", NodeKind::Node);
        let mut op = AddControlOperation::new(node, ControlKind::Billboard);

        redo(&mut op, &mut scene).0.unwrap();
        let id = op.control().unwrap();
        let (_, changes) = undo(&mut op, &mut scene);
        assert_eq!(changes, vec![ModelChange::RemovedControl { node, control: id }]);
        assert!(scene.controls(node).unwrap().is_empty());

        redo(&mut op, &mut scene).0.unwrap();
        assert_eq!(scene.controls(node).unwrap()[0].id, id);
    }

    #[test]
    fn remove_control_restores_position() {
        let mut scene = Scene::new();
        let node = scene.create_node("Spinner", NodeKind::Node);
        let first = scene.add_control(node, ControlKind::Billboard).unwrap();
        let second = scene
            .add_control(node, ControlKind::Rotation { degrees_per_second: 10.0 })
            .unwrap();

        let mut op = RemoveControlOperation::new(node, first);
        redo(&mut op, &mut scene).0.unwrap();
        let (_, changes) = undo(&mut op, &mut scene);

        let ids: Vec<_> = scene.controls(node).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(
            changes,
            vec![ModelChange::AddedControl {
                node,
                control: first,
                kind: ControlKind::Billboard
            }]
        );
    }

    #[test]
    fn failed_reinsert_keeps_control_for_retry() {
        let mut scene = Scene::new();
        let node = scene.create_node("Spinner", NodeKind::Node);
        let mut elsewhere = Scene::new();

        let mut add = AddControlOperation::new(node, ControlKind::Billboard);
        redo(&mut add, &mut scene).0.unwrap();
        let id = add.control().unwrap();
        undo(&mut add, &mut scene).0.unwrap();
        assert!(redo(&mut add, &mut elsewhere).0.is_err());
        assert_eq!(add.control(), Some(id));
        redo(&mut add, &mut scene).0.unwrap();
        assert_eq!(scene.controls(node).unwrap()[0].id, id);

        let mut remove = RemoveControlOperation::new(node, id);
        redo(&mut remove, &mut scene).0.unwrap();
        assert!(undo(&mut remove, &mut elsewhere).0.is_err());
        undo(&mut remove, &mut scene).0.unwrap();
        assert_eq!(scene.controls(node).unwrap()[0].id, id);
    }

    #[test]
    fn removing_unknown_control_fails_without_changes() {
        let mut scene = Scene::new();
        let node = scene.create_node("Spinner", NodeKind::Node);
        let other = scene.add_control(node, ControlKind::Billboard).unwrap();
        scene.remove_control(node, other).unwrap();

        let mut op = RemoveControlOperation::new(node, other);
        let (result, changes) = redo(&mut op, &mut scene);
        assert!(result.is_err());
        assert!(changes.is_empty());
        assert!(!op.notify_on_failure());
    }
}
