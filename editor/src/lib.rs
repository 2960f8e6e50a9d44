//! # Fernlight Editor
//!
//! The scene model and concrete editor operations of the Fernlight editor,
//! built on the executors and operation pipeline of `fernlight-core`.
//!
//! - [`scene`]: the engine-side scene graph, owned by the engine thread
//! - [`operations`]: undoable scene edits
//! - [`changes`]: change records and UI-side listeners
//! - [`session`]: history, posting from any thread, undo/redo
//! - [`engine_loop`]: the fixed-timestep engine thread

pub mod changes;
pub mod config;
pub mod engine_loop;
pub mod error;
pub mod log_capture;
pub mod operations;
pub mod registry;
pub mod scene;
pub mod script;
pub mod session;

pub use changes::{LoggingListener, ModelChange, ModelChangeConsumer, ModelNotifier};
pub use config::{EditorConfig, EngineLoopConfig, HistoryConfig};
pub use engine_loop::EngineThread;
pub use error::{EditorError, EditorResult};
pub use registry::{
    ControlKindTag, EmitterShapeTag, FactoryRegistry, NodeKindTag, Registries,
};
pub use scene::{
    AppState, Control, ControlId, ControlKind, EmitterShape, LightKind, NodeId, NodeKind,
    PropertyValue, Scene, SceneError,
};
pub use session::EditorSession;
