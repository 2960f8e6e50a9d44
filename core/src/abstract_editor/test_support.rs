//! Shared fixtures for the operation tests.

use std::sync::Arc;

use super::consumer::RecordingConsumer;
use super::operation::{Editable, EditorOperation, OperationError, OperationResult};
use super::pipeline::OperationContext;
use crate::config::ExecutorConfig;
use crate::fx::PumpedToolkit;
use crate::manager::ExecutorManager;

#[derive(Debug, Default)]
pub(crate) struct Counter {
    pub value: i32,
}

impl Editable for Counter {
    type Change = i32;
}

/// Sets the counter; consecutive instances merge like a slider drag.
#[derive(Debug)]
pub(crate) struct SetValue {
    pub old_value: i32,
    pub new_value: i32,
}

impl SetValue {
    pub fn new(old_value: i32, new_value: i32) -> Self {
        Self {
            old_value,
            new_value,
        }
    }
}

impl EditorOperation<Counter> for SetValue {
    fn redo_in_engine(&mut self, target: &mut Counter, changes: &mut Vec<i32>) -> OperationResult {
        target.value = self.new_value;
        changes.push(self.new_value);
        Ok(())
    }

    fn undo_in_engine(&mut self, target: &mut Counter, changes: &mut Vec<i32>) -> OperationResult {
        target.value = self.old_value;
        changes.push(self.old_value);
        Ok(())
    }

    fn description(&self) -> &str {
        "Set value"
    }

    fn merge(&mut self, other: &dyn EditorOperation<Counter>) -> bool {
        match other.as_any().downcast_ref::<SetValue>() {
            Some(other) => {
                self.new_value = other.new_value;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug)]
enum FailMode {
    Error,
    Panic,
}

/// Fails its redo; its undo always succeeds.
#[derive(Debug)]
pub(crate) struct Failing {
    mode: FailMode,
    notify_on_failure: bool,
}

impl Failing {
    /// Records `-1`, then returns an error.
    pub fn error(notify_on_failure: bool) -> Self {
        Self {
            mode: FailMode::Error,
            notify_on_failure,
        }
    }

    pub fn panic() -> Self {
        Self {
            mode: FailMode::Panic,
            notify_on_failure: true,
        }
    }
}

impl EditorOperation<Counter> for Failing {
    fn redo_in_engine(&mut self, _target: &mut Counter, changes: &mut Vec<i32>) -> OperationResult {
        match self.mode {
            FailMode::Error => {
                changes.push(-1);
                Err(OperationError::InvalidState("counter is locked".into()))
            }
            FailMode::Panic => panic!("expected test panic"),
        }
    }

    fn undo_in_engine(&mut self, _target: &mut Counter, _changes: &mut Vec<i32>) -> OperationResult {
        Ok(())
    }

    fn description(&self) -> &str {
        "Failing"
    }

    fn notify_on_failure(&self) -> bool {
        self.notify_on_failure
    }
}

/// An executor manager whose engine and UI contexts are stepped by hand on
/// the test thread.
pub(crate) struct Fixture {
    pub manager: ExecutorManager<Counter>,
    pub toolkit: Arc<PumpedToolkit>,
    pub consumer: Arc<RecordingConsumer<Counter>>,
    pub ctx: OperationContext<Counter>,
    pub counter: Counter,
}

impl Fixture {
    pub fn new() -> Self {
        let mut config = ExecutorConfig::default();
        config.background.executors = 1;
        config.background.pool_threads = 1;
        let manager = ExecutorManager::new(config).unwrap();
        let toolkit = Arc::new(PumpedToolkit::new());
        manager.attach_ui_toolkit(toolkit.clone());
        let consumer = Arc::new(RecordingConsumer::new());
        let ctx = OperationContext::new(manager.clone(), consumer.clone());
        Self {
            manager,
            toolkit,
            consumer,
            ctx,
            counter: Counter::default(),
        }
    }

    pub fn engine_tick(&mut self) -> usize {
        self.manager.engine_tick(&mut self.counter)
    }

    pub fn pump(&self) -> usize {
        self.toolkit.pump()
    }

    /// Alternates engine ticks and UI pumps until both are idle.
    pub fn settle(&mut self) {
        for _ in 0..32 {
            let ran = self.engine_tick() + self.pump();
            if ran == 0 {
                return;
            }
        }
        panic!("pipeline did not settle");
    }
}
