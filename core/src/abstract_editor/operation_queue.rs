//! Thread-safe queue for submitting operations from any thread.
//!
//! Only the UI thread owns the [`OperationHistory`](super::OperationHistory).
//! Background tasks and engine callbacks push operations here instead; the
//! UI thread drains the queue and executes them in submission order.

use std::fmt;

use parking_lot::Mutex;

use super::operation::{Editable, EditorOperation};

/// A queue of operations waiting for the UI thread.
pub struct OperationQueue<T: Editable> {
    queue: Mutex<Vec<Box<dyn EditorOperation<T>>>>,
}

impl<T: Editable> OperationQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Enqueues an operation.
    ///
    /// Returns `true` if the queue was empty before, i.e. the caller is the
    /// one that should schedule a drain on the UI thread.
    pub fn push(&self, operation: Box<dyn EditorOperation<T>>) -> bool {
        let mut queue = self.queue.lock();
        let was_empty = queue.is_empty();
        queue.push(operation);
        was_empty
    }

    /// Takes all queued operations in submission order.
    pub fn drain(&self) -> Vec<Box<dyn EditorOperation<T>>> {
        std::mem::take(&mut *self.queue.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

impl<T: Editable> Default for OperationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Editable> fmt::Debug for OperationQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationQueue")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstract_editor::test_support::{Counter, SetValue};
    use std::sync::Arc;

    #[test]
    fn push_reports_first_entry() {
        let queue = OperationQueue::<Counter>::new();
        assert!(queue.push(Box::new(SetValue::new(0, 1))));
        assert!(!queue.push(Box::new(SetValue::new(1, 2))));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain().len(), 2);
        assert!(queue.is_empty());
        assert!(queue.push(Box::new(SetValue::new(2, 3))));
    }

    #[test]
    fn drain_preserves_submission_order() {
        let queue = OperationQueue::<Counter>::new();
        for i in 0..4 {
            queue.push(Box::new(SetValue::new(i, i + 1)));
        }
        let mut counter = Counter::default();
        let mut changes = Vec::new();
        for mut operation in queue.drain() {
            operation.redo_in_engine(&mut counter, &mut changes).unwrap();
        }
        assert_eq!(changes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn concurrent_pushes_elect_one_drainer() {
        let queue = Arc::new(OperationQueue::<Counter>::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .filter(|i| queue.push(Box::new(SetValue::new(t, *i))))
                        .count()
                })
            })
            .collect();
        let firsts: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(firsts, 1);
        assert_eq!(queue.len(), 100);
    }

    #[test]
    fn debug_impl() {
        let queue = OperationQueue::<Counter>::new();
        queue.push(Box::new(SetValue::new(0, 1)));
        let debug = format!("{queue:?}");
        assert!(debug.contains("OperationQueue"));
        assert!(debug.contains("pending: 1"));
    }
}
