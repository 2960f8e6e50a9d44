//! Concrete scene operations.
//!
//! Each operation mutates the [`Scene`](crate::scene::Scene) inside
//! `*_in_engine` and records one [`ModelChange`](crate::changes::ModelChange)
//! per effect. Values only the engine knows (a node's index, a property's
//! previous value) are captured during the first redo.

mod app_state;
mod child;
mod control;
mod property;
mod rename;

pub use app_state::ChangeAppStateOperation;
pub use child::{AddChildOperation, MoveChildOperation, RemoveChildOperation};
pub use control::{AddControlOperation, RemoveControlOperation};
pub use property::PropertyOperation;
pub use rename::RenameNodeOperation;

use fernlight_core::abstract_editor::OperationError;

fn not_applied(description: &str) -> OperationError {
    OperationError::InvalidState(format!("\"{description}\" was never applied"))
}
