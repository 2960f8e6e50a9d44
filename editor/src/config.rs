//! Editor configuration loaded from `fernlight.toml`.

use std::path::Path;

use fernlight_core::ExecutorConfig;
use fernlight_core::abstract_editor::DEFAULT_MAX_UNDO;
use serde::{Deserialize, Serialize};

use crate::error::{EditorError, EditorResult};

/// Top-level editor configuration. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub executors: ExecutorConfig,
    pub history: HistoryConfig,
    pub engine_loop: EngineLoopConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Undo depth; the oldest entries are dropped beyond it.
    pub max_undo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLoopConfig {
    /// Fixed engine timestep in milliseconds.
    pub tick_ms: u64,
}

impl Default for EngineLoopConfig {
    fn default() -> Self {
        Self { tick_ms: 16 }
    }
}

impl EditorConfig {
    /// Parses a config from TOML text. `origin` is only used in errors.
    pub fn from_toml_str(content: &str, origin: &Path) -> EditorResult<Self> {
        toml::from_str(content).map_err(|source| EditorError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> EditorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| EditorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content, path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_executor_sections() {
        let config = EditorConfig::from_toml_str(
            r#"
[executors.fx]
thread_name = "ui"

[executors.engine]
max_tasks_per_tick = 8

[history]
max_undo = 5

[engine_loop]
tick_ms = 4
"#,
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(config.executors.fx.thread_name, "ui");
        assert_eq!(config.executors.engine.max_tasks_per_tick, 8);
        assert_eq!(config.executors.background.executors, 2);
        assert_eq!(config.history.max_undo, 5);
        assert_eq!(config.engine_loop.tick_ms, 4);
    }

    #[test]
    fn empty_file_is_default() {
        let config = EditorConfig::from_toml_str("", Path::new("inline")).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.history.max_undo, DEFAULT_MAX_UNDO);
        assert_eq!(config.engine_loop.tick_ms, 16);
    }

    #[test]
    fn unreadable_file() {
        let err = EditorConfig::load(Path::new("/nonexistent/fernlight.toml")).unwrap_err();
        assert!(matches!(err, EditorError::ConfigRead { .. }));
    }
}
