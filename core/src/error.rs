//! Executor error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or configuring the execution contexts.
///
/// Task failures are never reported through this type: a panicking task is
/// caught and logged by the executor that ran it.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("failed to spawn executor thread \"{name}\": {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create background runtime: {0}")]
    Runtime(#[source] std::io::Error),
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
}

/// Result type for executor construction.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
