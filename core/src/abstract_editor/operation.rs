//! Editable targets and reversible editor operations.
//!
//! - [`Editable`]: a type operations mutate, plus the change records they
//!   report back
//! - [`EditorOperation`]: one undoable change (Command pattern), split into
//!   an engine-side mutation and a UI-side notification
//! - [`OperationError`] / [`OperationResult`]: error handling for operations

use std::any::Any;
use std::fmt;

use thiserror::Error;

use super::pipeline::OperationState;

/// Helper trait for downcasting trait objects to concrete types.
///
/// Automatically implemented for all `'static` types. Used by
/// [`EditorOperation::merge`] to downcast `&dyn EditorOperation<T>` to the
/// concrete operation type.
pub trait AsAny: 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A type that editor operations mutate, typically the engine scene.
///
/// `Change` is the record an operation emits for every observable effect of
/// its mutation. Changes are collected on the engine thread and delivered
/// to a [`ChangeConsumer`](super::ChangeConsumer) on the UI thread, so they
/// must be owned, sendable values.
pub trait Editable: 'static {
    type Change: fmt::Debug + Send + 'static;
}

/// Which way an operation is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Redo,
    Undo,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redo => f.write_str("redo"),
            Self::Undo => f.write_str("undo"),
        }
    }
}

/// Error type for operation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The target object was not found.
    #[error("target not found: {0}")]
    TargetNotFound(String),
    /// The target is in an invalid state for this operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Redo or undo was requested while the operation was not in a state
    /// that accepts it (for example an undo while the redo is in flight).
    #[error("cannot {direction} an operation that is {state}")]
    OutOfOrder {
        state: OperationState,
        direction: Direction,
    },
    /// The engine-side mutation panicked.
    #[error("operation panicked: {0}")]
    Panicked(String),
    /// The executors were shut down before the operation could start.
    #[error("executors are shut down")]
    ShutDown,
    #[error("{0}")]
    Custom(String),
}

/// Result type for operation stages.
pub type OperationResult<T = ()> = Result<T, OperationError>;

/// A reversible editor operation.
///
/// An operation stores whatever it needs to apply and revert itself: the
/// target reference, an optional property key, the new value and the old
/// value. The old value is captured either at construction or, when only
/// the engine knows it, during the first [`redo_in_engine`](Self::redo_in_engine).
///
/// The two `*_in_engine` methods run on the engine thread with exclusive
/// access to the target. They push one `Change` per observable effect into
/// `changes`; those are delivered to the change consumer on the UI thread
/// after the mutation completes. Operations never mutate the target from
/// any other context.
///
/// # Merging
///
/// Incremental operations (each step of a slider drag) can override
/// [`merge`](Self::merge) so that consecutive operations collapse into one
/// history entry. Use [`AsAny::as_any`] on `other` to downcast it.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug)]
/// struct SetExposure {
///     camera: NodeId,
///     old: Option<f32>,
///     new: f32,
/// }
///
/// impl EditorOperation<Scene> for SetExposure {
///     fn redo_in_engine(&mut self, scene: &mut Scene, changes: &mut Vec<ModelChange>) -> OperationResult {
///         self.old = Some(scene.exposure(self.camera)?);
///         scene.set_exposure(self.camera, self.new)?;
///         changes.push(ModelChange::exposure(self.camera, self.new));
///         Ok(())
///     }
///     // ...
/// }
/// ```
pub trait EditorOperation<T: Editable>: fmt::Debug + AsAny + Send {
    /// Applies the operation on the engine thread.
    fn redo_in_engine(&mut self, target: &mut T, changes: &mut Vec<T::Change>) -> OperationResult;

    /// Reverts the operation on the engine thread.
    ///
    /// Must restore what [`redo_in_engine`](Self::redo_in_engine) changed.
    fn undo_in_engine(&mut self, target: &mut T, changes: &mut Vec<T::Change>) -> OperationResult;

    /// A short, human-readable description for the edit menu.
    fn description(&self) -> &str;

    /// Tries to absorb `other` into `self`.
    ///
    /// Returns `true` when `self` took over `other`'s effect, in which case
    /// the history keeps `self` as the single undo entry. `self` keeps its
    /// own old value. Default: no merging.
    fn merge(&mut self, other: &dyn EditorOperation<T>) -> bool {
        let _ = other;
        false
    }

    /// Whether this operation is recorded in the history.
    ///
    /// Non-recorded operations (camera moves, viewport tweaks) run through
    /// the same pipeline but cannot be undone. Default: `true`.
    fn is_recorded(&self) -> bool {
        true
    }

    /// Whether running this operation stops the next recorded operation from
    /// merging with the previous history entry.
    ///
    /// Only meaningful for non-recorded operations. Default: `false`.
    fn breaks_merge(&self) -> bool {
        false
    }

    /// Whether this operation changes document content.
    ///
    /// Return `false` for UI-state operations such as selection. They are
    /// undoable but do not count as unsaved changes. Default: `true`.
    fn modifies_content(&self) -> bool {
        true
    }

    /// Whether the change consumer is still notified after the engine-side
    /// mutation failed.
    ///
    /// When `false`, a failed mutation skips the notification stage and the
    /// operation settles right away. Default: `true`.
    fn notify_on_failure(&self) -> bool {
        true
    }
}
