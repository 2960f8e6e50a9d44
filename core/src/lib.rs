//! # Fernlight Core
//!
//! Concurrency core of the Fernlight scene editor.
//!
//! An editor runs three execution contexts: the UI thread owned by the GUI
//! toolkit, the engine thread that owns the scene, and background workers.
//! [`ExecutorManager`] moves tasks between them, and the
//! [`abstract_editor`] module builds undoable editor operations on top of
//! it: each operation mutates the scene on the engine thread and then
//! notifies UI models on the UI thread.

pub mod abstract_editor;
pub mod background;
pub mod config;
pub mod engine_queue;
pub mod error;
pub mod executor;
pub mod fx;
pub mod manager;
pub mod profiling;
pub mod task;
pub mod task_queue;

pub use background::{BackgroundPool, IoHandle, ScheduledTask};
pub use config::{BackgroundConfig, EngineConfig, ExecutorConfig, FxConfig};
pub use engine_queue::EngineTaskQueue;
pub use error::{ExecutorError, ExecutorResult};
pub use executor::{EditorTaskExecutor, ExecutorStats};
pub use fx::{FxDispatcher, HeadlessToolkit, PumpedToolkit, UiToolkit};
pub use manager::ExecutorManager;
pub use task::{CancelToken, EngineTask, FxTask, Task, panic_payload_to_string};
pub use task_queue::{Queued, TaskQueue};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
