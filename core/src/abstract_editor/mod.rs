//! Abstract editor framework for reversible, thread-hopping operations.
//!
//! The types here know nothing about a concrete scene. A target type
//! implements [`Editable`]; editors implement [`EditorOperation`] for it and
//! run them through an [`OperationHistory`].
//!
//! - [`EditorOperation`]: one undoable change, mutated on the engine thread
//! - [`OperationHandle`]: an operation plus its pipeline state
//! - [`OperationHistory`]: linear undo/redo sequence with a cursor
//! - [`OperationQueue`]: submission of operations from any thread
//! - [`ChangeConsumer`]: receives the recorded changes on the UI thread
//!
//! # Recorded vs non-recorded operations
//!
//! Operations are recorded in the history by default. Override
//! [`EditorOperation::is_recorded`] to return `false` for transient
//! operations like camera movement. Those can also
//! [break the merge chain](EditorOperation::breaks_merge) so that two
//! otherwise mergeable drags stay separate undo steps.
//!
//! Recorded operations returning `false` from
//! [`EditorOperation::modifies_content`] (selection changes) are undoable
//! but ignored by [`OperationHistory::has_unsaved_changes`].

mod consumer;
mod history;
mod operation;
mod operation_queue;
mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use consumer::{ChangeConsumer, NullConsumer, RecordingConsumer};
pub use history::{DEFAULT_MAX_UNDO, OperationHistory};
pub use operation::{
    AsAny, Direction, Editable, EditorOperation, OperationError, OperationResult,
};
pub use operation_queue::OperationQueue;
pub use pipeline::{OperationContext, OperationHandle, OperationState};
