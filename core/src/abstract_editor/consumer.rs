//! Receivers of the changes operations report.

use std::fmt;

use parking_lot::Mutex;

use super::operation::Editable;

/// Callback interface notified in the last stage of an operation.
///
/// Called only on the UI thread, once per change, in the order the
/// operation recorded them. Implementations update UI models (tree views,
/// property panels) and must not touch the engine target.
pub trait ChangeConsumer<T: Editable>: Send + Sync {
    fn notify_change(&self, change: &T::Change);
}

/// Ignores every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullConsumer;

impl<T: Editable> ChangeConsumer<T> for NullConsumer {
    fn notify_change(&self, _change: &T::Change) {}
}

/// Keeps a copy of every change it receives.
pub struct RecordingConsumer<T: Editable> {
    changes: Mutex<Vec<T::Change>>,
}

impl<T: Editable> RecordingConsumer<T> {
    pub fn new() -> Self {
        Self {
            changes: Mutex::new(Vec::new()),
        }
    }

    /// Takes the recorded changes, leaving the consumer empty.
    pub fn take(&self) -> Vec<T::Change> {
        std::mem::take(&mut *self.changes.lock())
    }

    pub fn len(&self) -> usize {
        self.changes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }
}

impl<T: Editable> Default for RecordingConsumer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Editable> ChangeConsumer<T> for RecordingConsumer<T>
where
    T::Change: Clone,
{
    fn notify_change(&self, change: &T::Change) {
        self.changes.lock().push(change.clone());
    }
}

impl<T: Editable> fmt::Debug for RecordingConsumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingConsumer")
            .field("changes", &*self.changes.lock())
            .finish()
    }
}
