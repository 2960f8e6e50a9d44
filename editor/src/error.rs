//! Editor error types.

use std::path::PathBuf;

use fernlight_core::ExecutorError;
use fernlight_core::abstract_editor::OperationError;
use thiserror::Error;

use crate::scene::SceneError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no factory registered for {0}")]
    UnknownFactory(String),
    #[error("failed to spawn engine thread: {0}")]
    EngineSpawn(#[source] std::io::Error),
    #[error("engine thread panicked: {0}")]
    EnginePanicked(String),
    #[error("logger already installed: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("timed out after {0:?} waiting for the editor to settle")]
    Timeout(std::time::Duration),
}

pub type EditorResult<T> = Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_are_transparent() {
        let err: EditorError = OperationError::Custom("boom".into()).into();
        assert_eq!(err.to_string(), "boom");
        let err = EditorError::UnknownFactory("Camera".into());
        assert_eq!(err.to_string(), "no factory registered for Camera");
    }
}
