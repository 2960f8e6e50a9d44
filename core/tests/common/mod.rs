//! Shared helpers for the core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use fernlight_core::abstract_editor::{
    ChangeConsumer, Editable, EditorOperation, OperationContext, OperationResult,
};
use fernlight_core::{ExecutorConfig, ExecutorManager, PumpedToolkit};
use parking_lot::Mutex;

static LOGGER: Once = Once::new();

/// Installs `env_logger` once so failures show up with `RUST_LOG=debug`.
pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn small_config() -> ExecutorConfig {
    let mut config = ExecutorConfig::default();
    config.background.executors = 2;
    config.background.pool_threads = 2;
    config
}

/// A target with one observable property.
#[derive(Debug, Default)]
pub struct Target {
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Mutated { op: u32, value: i32 },
    Notified { op: u32, value: i32 },
}

impl Editable for Target {
    type Change = (u32, i32);
}

/// Records the order in which stages complete across threads.
#[derive(Debug, Default)]
pub struct StageLog {
    entries: Mutex<Vec<Stage>>,
}

impl StageLog {
    pub fn push(&self, stage: Stage) {
        self.entries.lock().push(stage);
    }

    pub fn snapshot(&self) -> Vec<Stage> {
        self.entries.lock().clone()
    }
}

/// Consumer that logs a `Notified` entry for every change.
pub struct LoggingConsumer(pub Arc<StageLog>);

impl ChangeConsumer<Target> for LoggingConsumer {
    fn notify_change(&self, change: &(u32, i32)) {
        self.0.push(Stage::Notified {
            op: change.0,
            value: change.1,
        });
    }
}

/// Sets `Target::value`, logging the engine stage.
#[derive(Debug)]
pub struct SetTargetValue {
    pub id: u32,
    pub old_value: i32,
    pub new_value: i32,
    pub log: Arc<StageLog>,
}

impl SetTargetValue {
    fn apply(&self, target: &mut Target, value: i32, changes: &mut Vec<(u32, i32)>) {
        target.value = value;
        self.log.push(Stage::Mutated { op: self.id, value });
        changes.push((self.id, value));
    }
}

impl EditorOperation<Target> for SetTargetValue {
    fn redo_in_engine(&mut self, target: &mut Target, changes: &mut Vec<(u32, i32)>) -> OperationResult {
        self.apply(target, self.new_value, changes);
        Ok(())
    }

    fn undo_in_engine(&mut self, target: &mut Target, changes: &mut Vec<(u32, i32)>) -> OperationResult {
        self.apply(target, self.old_value, changes);
        Ok(())
    }

    fn description(&self) -> &str {
        "Set target value"
    }
}

/// Manager plus a UI context pumped by the test thread.
pub struct Harness {
    pub manager: ExecutorManager<Target>,
    pub toolkit: Arc<PumpedToolkit>,
    pub log: Arc<StageLog>,
    pub ctx: OperationContext<Target>,
    pub target: Target,
}

impl Harness {
    pub fn new() -> Self {
        init_logging();
        let manager = ExecutorManager::new(small_config()).unwrap();
        let toolkit = Arc::new(PumpedToolkit::new());
        manager.attach_ui_toolkit(toolkit.clone());
        let log = Arc::new(StageLog::default());
        let ctx = OperationContext::new(manager.clone(), Arc::new(LoggingConsumer(log.clone())));
        Self {
            manager,
            toolkit,
            log,
            ctx,
            target: Target::default(),
        }
    }

    pub fn set_value(&self, id: u32, old_value: i32, new_value: i32) -> Box<dyn EditorOperation<Target>> {
        Box::new(SetTargetValue {
            id,
            old_value,
            new_value,
            log: self.log.clone(),
        })
    }

    pub fn engine_tick(&mut self) -> usize {
        self.manager.engine_tick(&mut self.target)
    }

    pub fn pump(&self) -> usize {
        self.toolkit.pump()
    }

    pub fn settle(&mut self) {
        for _ in 0..64 {
            if self.engine_tick() + self.pump() == 0 {
                return;
            }
        }
        panic!("operations did not settle");
    }
}
