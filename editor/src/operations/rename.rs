use fernlight_core::abstract_editor::{EditorOperation, OperationResult};

use super::not_applied;
use crate::changes::ModelChange;
use crate::scene::{NodeId, Scene};

#[derive(Debug)]
pub struct RenameNodeOperation {
    node: NodeId,
    name: String,
    previous: Option<String>,
}

impl RenameNodeOperation {
    pub fn new(node: NodeId, name: impl Into<String>) -> Self {
        Self {
            node,
            name: name.into(),
            previous: None,
        }
    }
}

impl EditorOperation<Scene> for RenameNodeOperation {
    fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let old = scene.set_name(self.node, self.name.clone())?;
        self.previous = Some(old.clone());
        changes.push(ModelChange::Renamed {
            node: self.node,
            old,
            new: self.name.clone(),
        });
        Ok(())
    }

    fn undo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let previous = self
            .previous
            .clone()
            .ok_or_else(|| not_applied(self.description()))?;
        let old = scene.set_name(self.node, previous.clone())?;
        changes.push(ModelChange::Renamed {
            node: self.node,
            old,
            new: previous,
        });
        Ok(())
    }

    fn description(&self) -> &str {
        "Rename node"
    }
}
