use fernlight_core::abstract_editor::{EditorOperation, OperationResult};

use crate::changes::ModelChange;
use crate::scene::{NodeId, PropertyValue, Scene};

/// Sets or clears one node property.
///
/// Consecutive operations on the same node and key merge, so a slider drag
/// becomes a single undo step back to the value before the drag.
#[derive(Debug)]
pub struct PropertyOperation {
    node: NodeId,
    key: String,
    old: Option<PropertyValue>,
    new: Option<PropertyValue>,
    old_captured: bool,
    description: String,
}

impl PropertyOperation {
    /// The previous value is read from the scene on the first redo.
    pub fn new(node: NodeId, key: impl Into<String>, value: Option<PropertyValue>) -> Self {
        let key = key.into();
        Self {
            description: format!("Change {key}"),
            node,
            key,
            old: None,
            new: value,
            old_captured: false,
        }
    }

    /// Uses the value the UI model already holds as the previous value.
    pub fn with_old_value(mut self, old: Option<PropertyValue>) -> Self {
        self.old = old;
        self.old_captured = true;
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn new_value(&self) -> Option<&PropertyValue> {
        self.new.as_ref()
    }
}

impl EditorOperation<Scene> for PropertyOperation {
    fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let previous = scene.set_property(self.node, &self.key, self.new.clone())?;
        if !self.old_captured {
            self.old = previous.clone();
            self.old_captured = true;
        }
        changes.push(ModelChange::ChangedProperty {
            node: self.node,
            key: self.key.clone(),
            old: previous,
            new: self.new.clone(),
        });
        Ok(())
    }

    fn undo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
        let previous = scene.set_property(self.node, &self.key, self.old.clone())?;
        changes.push(ModelChange::ChangedProperty {
            node: self.node,
            key: self.key.clone(),
            old: previous,
            new: self.old.clone(),
        });
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn merge(&mut self, other: &dyn EditorOperation<Scene>) -> bool {
        match other.as_any().downcast_ref::<PropertyOperation>() {
            Some(other) if other.node == self.node && other.key == self.key => {
                self.new = other.new.clone();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::RenameNodeOperation;
    use crate::operations::testing::{redo, undo};
    use crate::scene::NodeKind;

    fn scene_with_node() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let node = scene.create_node("Box", NodeKind::Node);
        scene.attach_child(scene.root(), node, None).unwrap();
        (scene, node)
    }

    #[test]
    fn captures_old_value_on_first_redo() {
        let (mut scene, node) = scene_with_node();
        scene
            .set_property(node, "mass", Some(PropertyValue::Float(1.0)))
            .unwrap();

        let mut op = PropertyOperation::new(node, "mass", Some(PropertyValue::Float(2.0)));
        redo(&mut op, &mut scene).0.unwrap();
        let (result, changes) = undo(&mut op, &mut scene);
        result.unwrap();

        assert_eq!(
            scene.property(node, "mass").unwrap(),
            Some(&PropertyValue::Float(1.0))
        );
        assert_eq!(
            changes,
            vec![ModelChange::ChangedProperty {
                node,
                key: "mass".into(),
                old: Some(PropertyValue::Float(2.0)),
                new: Some(PropertyValue::Float(1.0)),
            }]
        );
    }

    #[test]
    fn undo_removes_property_that_did_not_exist() {
        let (mut scene, node) = scene_with_node();
        let mut op = PropertyOperation::new(node, "tag", Some(PropertyValue::Text("hero".into())));
        redo(&mut op, &mut scene).0.unwrap();
        undo(&mut op, &mut scene).0.unwrap();
        assert_eq!(scene.property(node, "tag").unwrap(), None);
    }

    #[test]
    fn explicit_old_value_wins() {
        let (mut scene, node) = scene_with_node();
        let mut op = PropertyOperation::new(node, "level", Some(PropertyValue::Int(3)))
            .with_old_value(Some(PropertyValue::Int(1)));
        redo(&mut op, &mut scene).0.unwrap();
        undo(&mut op, &mut scene).0.unwrap();
        assert_eq!(
            scene.property(node, "level").unwrap(),
            Some(&PropertyValue::Int(1))
        );
    }

    #[test]
    fn merges_only_same_node_and_key() {
        let (_, node) = scene_with_node();
        let mut drag = PropertyOperation::new(node, "mass", Some(PropertyValue::Float(1.0)));
        assert!(drag.merge(&PropertyOperation::new(node, "mass", Some(PropertyValue::Float(5.0)))));
        assert_eq!(drag.new_value(), Some(&PropertyValue::Float(5.0)));
        assert!(!drag.merge(&PropertyOperation::new(node, "size", None)));
        assert!(!drag.merge(&RenameNodeOperation::new(node, "Other")));
        assert_eq!(drag.description(), "Change mass");
    }
}
