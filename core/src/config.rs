//! Executor configuration.
//!
//! Loaded from TOML; every field has a default, so an empty file (or no
//! file at all) yields a working setup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExecutorError, ExecutorResult};

/// Top-level configuration for the three execution contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub engine: EngineConfig,
    pub background: BackgroundConfig,
    pub fx: FxConfig,
}

/// Engine-thread queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum engine tasks run per tick; `0` drains everything.
    pub max_tasks_per_tick: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_tick: 512,
        }
    }
}

/// Background execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Number of ordered background executors (round-robin).
    pub executors: usize,
    /// Upper bound on blocking threads of the unordered pool.
    pub pool_threads: usize,
    /// Async worker threads driving timers and IO futures.
    pub runtime_threads: usize,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            executors: 2,
            pool_threads: std::thread::available_parallelism().map_or(4, |n| n.get()),
            runtime_threads: 1,
        }
    }
}

/// UI-thread settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// Thread name used by the headless toolkit.
    pub thread_name: String,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            thread_name: "fx".into(),
        }
    }
}

impl ExecutorConfig {
    /// Parses a config from TOML text. `origin` is only used in errors.
    pub fn from_toml_str(content: &str, origin: &Path) -> ExecutorResult<Self> {
        toml::from_str(content).map_err(|source| ExecutorError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads a config from a TOML file.
    pub fn load(path: &Path) -> ExecutorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ExecutorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ExecutorConfig::from_toml_str("", Path::new("inline")).unwrap();
        assert_eq!(config, ExecutorConfig::default());
        assert_eq!(config.engine.max_tasks_per_tick, 512);
        assert_eq!(config.fx.thread_name, "fx");
        assert!(config.background.pool_threads >= 1);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ExecutorConfig::from_toml_str(
            "[background]\nexecutors = 4\n\n[engine]\nmax_tasks_per_tick = 0\n",
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(config.background.executors, 4);
        assert_eq!(config.background.runtime_threads, 1);
        assert_eq!(config.engine.max_tasks_per_tick, 0);
    }

    #[test]
    fn invalid_toml_reports_origin() {
        let err = ExecutorConfig::from_toml_str("[engine\n", Path::new("broken.toml")).unwrap_err();
        assert!(matches!(err, ExecutorError::ConfigParse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ExecutorConfig::load(Path::new("/nonexistent/fernlight.toml")).unwrap_err();
        assert!(matches!(err, ExecutorError::ConfigRead { .. }));
    }
}
