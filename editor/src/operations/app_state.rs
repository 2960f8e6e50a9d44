use fernlight_core::abstract_editor::{EditorOperation, OperationResult};

use super::not_applied;
use crate::changes::ModelChange;
use crate::scene::Scene;

/// Enables or disables a scene-wide app state.
#[derive(Debug)]
pub struct ChangeAppStateOperation {
    name: String,
    enabled: bool,
    previous: Option<bool>,
    description: String,
}

impl ChangeAppStateOperation {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        let name = name.into();
        Self {
            description: format!("{} {name}", if enabled { "Enable" } else { "Disable" }),
            name,
            enabled,
            previous: None,
        }
    }
}

impl EditorOperation<Scene> for ChangeAppStateOperation {
    fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        self.previous = Some(scene.set_app_state_enabled(&self.name, self.enabled)?);
        changes.push(ModelChange::ChangedAppState {
            name: self.name.clone(),
            enabled: self.enabled,
        });
        Ok(())
    }

    fn undo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let previous = self.previous.ok_or_else(|| not_applied(&self.description))?;
        scene.set_app_state_enabled(&self.name, previous)?;
        changes.push(ModelChange::ChangedAppState {
            name: self.name.clone(),
            enabled: previous,
        });
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
