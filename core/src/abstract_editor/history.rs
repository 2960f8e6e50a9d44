//! Undo/redo operation history.
//!
//! [`OperationHistory`] is a linear sequence of operation handles with a
//! cursor. Entries before the cursor are redone (applied, or on their way
//! there); entries at and after the cursor were undone. Executing a new
//! operation while the cursor is not at the end discards the redo branch.
//!
//! The history only does bookkeeping and starts pipelines. The engine and
//! UI stages run later on their own threads, so a call returns as soon as
//! the first stage is posted.

use std::collections::VecDeque;
use std::fmt;

use super::operation::{Editable, EditorOperation, OperationError, OperationResult};
use super::pipeline::{OperationContext, OperationHandle};

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_UNDO: usize = 100;

/// Manages the undo/redo sequence of editor operations.
///
/// # Example
///
/// ```ignore
/// let mut history = OperationHistory::new(50);
///
/// history.execute(Box::new(RenameNodeOperation::new(node, "Lamp")), &ctx)?;
/// history.undo_last(&ctx)?;
/// history.redo_next(&ctx)?;
/// ```
pub struct OperationHistory<T: Editable> {
    entries: VecDeque<OperationHandle<T>>,
    cursor: usize,
    max_undo: usize,
    merge_broken: bool,
    /// Content-modifying steps between the current state and the last save.
    ///
    /// - `Some(0)`: the current state is the saved one.
    /// - `Some(n)`, `n > 0`: `n` undos lead back to the save.
    /// - `Some(n)`, `n < 0`: `|n|` redos lead back to the save.
    /// - `None`: never saved, or the save point is unreachable (dropped by
    ///   the depth limit or discarded with a redo branch).
    save_distance: Option<i64>,
}

impl<T: Editable> OperationHistory<T> {
    /// Creates an empty history that keeps at most `max_undo` entries.
    pub fn new(max_undo: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_undo,
            merge_broken: false,
            save_distance: Some(0),
        }
    }

    /// Starts the redo pipeline of a new operation and records it.
    ///
    /// **Recorded operations** (the default) discard the redo branch, then
    /// try to [merge](EditorOperation::merge) into the entry before the
    /// cursor. A merged operation still runs its own pipeline, but the
    /// history keeps only the older entry. Otherwise the operation is
    /// appended and the oldest entry is dropped beyond `max_undo`.
    ///
    /// **Non-recorded operations** run without touching the history. If one
    /// [breaks the merge chain](EditorOperation::breaks_merge), the next
    /// recorded operation gets its own entry.
    ///
    /// Returns the handle of the started pipeline. After the executors shut
    /// down it fails with [`ShutDown`](OperationError::ShutDown) and leaves
    /// the history untouched.
    pub fn execute(
        &mut self,
        operation: Box<dyn EditorOperation<T>>,
        ctx: &OperationContext<T>,
    ) -> OperationResult<OperationHandle<T>> {
        if ctx.manager().is_shut_down() {
            log::warn!("\"{}\" not executed: executors are shut down", operation.description());
            return Err(OperationError::ShutDown);
        }
        if !operation.is_recorded() {
            if operation.breaks_merge() {
                self.merge_broken = true;
            }
            let handle = OperationHandle::new(operation);
            handle.redo(ctx)?;
            return Ok(handle);
        }

        let is_content = operation.modifies_content();

        if self.cursor < self.entries.len() {
            log::debug!(
                "discarding {} redo entries",
                self.entries.len() - self.cursor
            );
            self.entries.truncate(self.cursor);
            if let Some(d) = self.save_distance
                && d < 0
            {
                self.save_distance = None;
            }
        }

        if !self.merge_broken
            && let Some(top) = self.entries.back()
            && top.with_operation(|top| top.merge(operation.as_ref()))
        {
            if is_content && self.save_distance == Some(0) {
                self.save_distance = None;
            }
            let handle = OperationHandle::new(operation);
            handle.redo(ctx)?;
            return Ok(handle);
        }
        self.merge_broken = false;

        let handle = OperationHandle::new(operation);
        handle.redo(ctx)?;

        if is_content && let Some(d) = &mut self.save_distance {
            *d += 1;
        }
        self.entries.push_back(handle.clone());
        self.cursor += 1;
        self.enforce_depth();
        Ok(handle)
    }

    /// Starts undoing the entry before the cursor.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. Fails with
    /// [`OutOfOrder`](super::OperationError::OutOfOrder), leaving the cursor
    /// where it was, while that entry's redo is still in flight.
    pub fn undo_last(
        &mut self,
        ctx: &OperationContext<T>,
    ) -> OperationResult<Option<OperationHandle<T>>> {
        let Some(index) = self.cursor.checked_sub(1) else {
            return Ok(None);
        };
        let handle = self.entries[index].clone();
        handle.undo(ctx)?;
        self.cursor = index;
        if handle.modifies_content()
            && let Some(d) = &mut self.save_distance
        {
            *d -= 1;
        }
        Ok(Some(handle))
    }

    /// Starts redoing the entry at the cursor.
    ///
    /// Returns `Ok(None)` when there is nothing to redo. Fails with
    /// [`OutOfOrder`](super::OperationError::OutOfOrder), leaving the cursor
    /// where it was, while that entry's undo is still in flight.
    pub fn redo_next(
        &mut self,
        ctx: &OperationContext<T>,
    ) -> OperationResult<Option<OperationHandle<T>>> {
        let Some(handle) = self.entries.get(self.cursor).cloned() else {
            return Ok(None);
        };
        handle.redo(ctx)?;
        self.cursor += 1;
        if handle.modifies_content()
            && let Some(d) = &mut self.save_distance
        {
            *d += 1;
        }
        Ok(Some(handle))
    }

    fn enforce_depth(&mut self) {
        while self.entries.len() > self.max_undo && self.cursor > 0 {
            self.entries.pop_front();
            self.cursor -= 1;
            if let Some(d) = self.save_distance
                && d > self.cursor as i64
            {
                self.save_distance = None;
            }
        }
    }

    /// Index of the next entry to redo; equals the number of undoable entries.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    pub fn redo_count(&self) -> usize {
        self.entries.len() - self.cursor
    }

    pub fn get(&self, index: usize) -> Option<&OperationHandle<T>> {
        self.entries.get(index)
    }

    /// Undo descriptions, most recent first.
    pub fn undo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.entries
            .range(..self.cursor)
            .rev()
            .map(OperationHandle::description)
    }

    /// Redo descriptions, next to redo first.
    pub fn redo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.entries
            .range(self.cursor..)
            .map(OperationHandle::description)
    }

    /// All descriptions, oldest first.
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(OperationHandle::description)
    }

    /// `true` when no entry has a stage in flight.
    pub fn is_settled(&self) -> bool {
        self.entries.iter().all(OperationHandle::is_settled)
    }

    pub fn max_undo(&self) -> usize {
        self.max_undo
    }

    /// Records the current state as saved.
    pub fn mark_saved(&mut self) {
        self.save_distance = Some(0);
    }

    /// Returns `true` if the current state differs from the last save, or
    /// the save point can no longer be reached.
    pub fn has_unsaved_changes(&self) -> bool {
        self.save_distance != Some(0)
    }

    /// Forgets every entry. In-flight pipelines still finish.
    ///
    /// If the current state was the saved one it stays saved; otherwise the
    /// save point is lost.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.merge_broken = false;
        if self.save_distance != Some(0) {
            self.save_distance = None;
        }
    }
}

impl<T: Editable> fmt::Debug for OperationHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHistory")
            .field("len", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("max_undo", &self.max_undo)
            .field("merge_broken", &self.merge_broken)
            .field("save_distance", &self.save_distance)
            .finish()
    }
}
