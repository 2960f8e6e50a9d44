//! The staged redo/undo pipeline.
//!
//! Running an operation hops across threads in three stages:
//!
//! 1. **Begin** on the caller (usually the UI thread): check the state
//!    transition and post the mutation to the engine queue.
//! 2. **Mutate** on the engine thread: call `redo_in_engine` or
//!    `undo_in_engine`, collecting changes, then post them to the UI queue.
//! 3. **Notify** on the UI thread: hand every change to the
//!    [`ChangeConsumer`] and settle the operation.
//!
//! Mutation always finishes before notification is posted. Two operations
//! started back to back mutate in order because the engine queue has a
//! single consumer. A failed mutation is logged and remembered as the
//! handle's [`last_error`](OperationHandle::last_error); there is no
//! rollback and the operation still settles, so history navigation goes on.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::consumer::ChangeConsumer;
use super::operation::{Direction, Editable, EditorOperation, OperationError, OperationResult};
use crate::manager::ExecutorManager;
use crate::task::panic_payload_to_string;

/// Lifecycle of an operation.
///
/// ```text
/// Pending --redo--> Mutating(Redo) --> Notifying(Redo) --> Applied
/// Applied --undo--> Mutating(Undo) --> Notifying(Undo) --> Reverted
/// Reverted --redo--> Mutating(Redo) ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    /// Created but never run.
    Pending,
    /// Waiting for or running on the engine thread.
    Mutating(Direction),
    /// Waiting for or running the change notification on the UI thread.
    Notifying(Direction),
    Applied,
    Reverted,
}

impl OperationState {
    /// `true` when no stage is in flight.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Pending | Self::Applied | Self::Reverted)
    }

    /// Whether a run in `direction` may start from this state.
    pub fn accepts(self, direction: Direction) -> bool {
        match direction {
            Direction::Redo => matches!(self, Self::Pending | Self::Reverted),
            Direction::Undo => matches!(self, Self::Applied),
        }
    }

    fn settled_after(direction: Direction) -> Self {
        match direction {
            Direction::Redo => Self::Applied,
            Direction::Undo => Self::Reverted,
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Mutating(direction) => write!(f, "mutating ({direction})"),
            Self::Notifying(direction) => write!(f, "notifying ({direction})"),
            Self::Applied => f.write_str("applied"),
            Self::Reverted => f.write_str("reverted"),
        }
    }
}

/// What a running operation needs: the executors and the change consumer.
pub struct OperationContext<T: Editable> {
    manager: ExecutorManager<T>,
    consumer: Arc<dyn ChangeConsumer<T>>,
}

impl<T: Editable> OperationContext<T> {
    pub fn new(manager: ExecutorManager<T>, consumer: Arc<dyn ChangeConsumer<T>>) -> Self {
        Self { manager, consumer }
    }

    pub fn manager(&self) -> &ExecutorManager<T> {
        &self.manager
    }

    pub fn consumer(&self) -> &Arc<dyn ChangeConsumer<T>> {
        &self.consumer
    }
}

impl<T: Editable> Clone for OperationContext<T> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            consumer: self.consumer.clone(),
        }
    }
}

impl<T: Editable> fmt::Debug for OperationContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

struct Status {
    state: OperationState,
    last_error: Option<OperationError>,
}

struct Shared<T: Editable> {
    operation: Mutex<Box<dyn EditorOperation<T>>>,
    description: String,
    modifies_content: bool,
    status: Mutex<Status>,
    settled: Condvar,
}

/// A shared handle to an operation and its pipeline state.
///
/// Cloning the handle does not clone the operation. The history keeps one
/// clone, and the in-flight stages keep others until they finish.
pub struct OperationHandle<T: Editable> {
    shared: Arc<Shared<T>>,
}

impl<T: Editable> Clone for OperationHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Editable> OperationHandle<T> {
    pub fn new(operation: Box<dyn EditorOperation<T>>) -> Self {
        let description = operation.description().to_owned();
        let modifies_content = operation.modifies_content();
        Self {
            shared: Arc::new(Shared {
                operation: Mutex::new(operation),
                description,
                modifies_content,
                status: Mutex::new(Status {
                    state: OperationState::Pending,
                    last_error: None,
                }),
                settled: Condvar::new(),
            }),
        }
    }

    pub fn state(&self) -> OperationState {
        self.shared.status.lock().state
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// The error of the most recent mutation, if it failed.
    pub fn last_error(&self) -> Option<OperationError> {
        self.shared.status.lock().last_error.clone()
    }

    /// Description captured when the handle was created.
    pub fn description(&self) -> &str {
        &self.shared.description
    }

    pub fn modifies_content(&self) -> bool {
        self.shared.modifies_content
    }

    /// Runs `f` with exclusive access to the operation.
    ///
    /// Blocks while the engine stage of this operation is running.
    pub fn with_operation<R>(&self, f: impl FnOnce(&mut dyn EditorOperation<T>) -> R) -> R {
        let mut operation = self.shared.operation.lock();
        f(operation.as_mut())
    }

    /// Returns `true` if both handles refer to the same operation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Starts the redo pipeline. Accepted from `Pending` and `Reverted`.
    pub fn redo(&self, ctx: &OperationContext<T>) -> OperationResult {
        self.begin(Direction::Redo, ctx)
    }

    /// Starts the undo pipeline. Accepted from `Applied`.
    pub fn undo(&self, ctx: &OperationContext<T>) -> OperationResult {
        self.begin(Direction::Undo, ctx)
    }

    /// Blocks until no stage is in flight or `timeout` elapses.
    ///
    /// Returns `true` if the operation is settled. Must not be called on the
    /// engine or UI thread while that thread still has to run a stage.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut status = self.shared.status.lock();
        while !status.state.is_settled() {
            if self
                .shared
                .settled
                .wait_until(&mut status, deadline)
                .timed_out()
            {
                return status.state.is_settled();
            }
        }
        true
    }

    fn begin(&self, direction: Direction, ctx: &OperationContext<T>) -> OperationResult {
        let previous = {
            let mut status = self.shared.status.lock();
            if !status.state.accepts(direction) {
                log::warn!(
                    "rejected {direction} of \"{}\": operation is {}",
                    self.shared.description,
                    status.state
                );
                return Err(OperationError::OutOfOrder {
                    state: status.state,
                    direction,
                });
            }
            let previous = status.state;
            status.state = OperationState::Mutating(direction);
            status.last_error = None;
            previous
        };

        let handle = self.clone();
        let stage_ctx = ctx.clone();
        let posted = ctx
            .manager()
            .add_engine_task(move |target: &mut T| handle.mutate(direction, target, &stage_ctx));
        if !posted {
            log::warn!(
                "{direction} of \"{}\" not started: executors are shut down",
                self.shared.description
            );
            self.shared.status.lock().state = previous;
            return Err(OperationError::ShutDown);
        }
        Ok(())
    }

    fn mutate(&self, direction: Direction, target: &mut T, ctx: &OperationContext<T>) {
        crate::profile_scope!("operation: mutate");
        let mut changes = Vec::new();
        let (outcome, notify_on_failure) = {
            let mut operation = self.shared.operation.lock();
            let outcome = catch_unwind(AssertUnwindSafe(|| match direction {
                Direction::Redo => operation.redo_in_engine(target, &mut changes),
                Direction::Undo => operation.undo_in_engine(target, &mut changes),
            }));
            (outcome, operation.notify_on_failure())
        };

        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            Err(payload) => Some(OperationError::Panicked(panic_payload_to_string(&*payload))),
        };
        if let Some(err) = &error {
            log::error!(
                "{direction} of \"{}\" failed in engine: {err}",
                self.shared.description
            );
        }
        let notify = error.is_none() || notify_on_failure;

        {
            let mut status = self.shared.status.lock();
            status.last_error = error;
            if notify {
                status.state = OperationState::Notifying(direction);
            }
        }

        if notify {
            let handle = self.clone();
            let consumer = ctx.consumer().clone();
            ctx.manager()
                .add_fx_task(move || handle.notify(direction, changes, consumer.as_ref()));
        } else {
            self.settle(direction);
        }
    }

    fn notify(&self, direction: Direction, changes: Vec<T::Change>, consumer: &dyn ChangeConsumer<T>) {
        crate::profile_scope!("operation: notify");
        for change in &changes {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| consumer.notify_change(change))) {
                log::error!(
                    "change consumer panicked on {change:?} from \"{}\": {}",
                    self.shared.description,
                    panic_payload_to_string(&*payload)
                );
            }
        }
        self.settle(direction);
    }

    fn settle(&self, direction: Direction) {
        self.shared.status.lock().state = OperationState::settled_after(direction);
        self.shared.settled.notify_all();
    }
}

impl<T: Editable> fmt::Debug for OperationHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.shared.status.lock();
        f.debug_struct("OperationHandle")
            .field("description", &self.shared.description)
            .field("state", &status.state)
            .field("last_error", &status.last_error)
            .finish()
    }
}
