//! Engine configuration
//!
//! Read from a JSON file (`calcsheet.json`); every field has a default so a
//! partial file is valid. Unknown fields are rejected to catch typos.

use serde::{Deserialize, Serialize};
use services_recalc_scheduler::{Duration, DEFAULT_DEBOUNCE_MS};
use sheet_core::DEFAULT_GLOBALS_PATH;
use sheet_renderer_host::{OverlayAnchor, RenderMode};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "calcsheet.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Debounce window for edit bursts
    pub debounce_ms: u64,
    pub render_mode: RenderMode,
    pub overlay_anchor: OverlayAnchor,
    /// Definitions resource loaded into the seed scope
    pub globals_path: PathBuf,
    /// Nesting limit for user function calls
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            render_mode: RenderMode::default(),
            overlay_anchor: OverlayAnchor::default(),
            globals_path: PathBuf::from(DEFAULT_GLOBALS_PATH),
            max_call_depth: expr_core::DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_call_depth must be greater than zero".to_string(),
            ));
        }
        if self.max_call_depth > expr_core::MAX_CALL_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "max_call_depth cannot exceed {}",
                expr_core::MAX_CALL_DEPTH
            )));
        }
        if self.globals_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "globals_path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Loads engine configuration from disk
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let data = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::load_from_str(&data)
    }

    pub fn load_from_str(data: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(data).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `calcsheet.json` from `dir`, falling back to defaults when the
    /// file does not exist
    pub fn load_or_default(dir: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        match Self::load_from_path(&path) {
            Err(ConfigError::NotFound(_)) => Ok(EngineConfig::default()),
            other => other,
        }
    }

    pub fn save_to_path(config: &EngineConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        fs::write(path, data).map_err(|err| ConfigError::Io(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.render_mode, RenderMode::Rewrite);
        assert_eq!(config.overlay_anchor, OverlayAnchor::AfterMarker);
        assert_eq!(config.globals_path, PathBuf::from("variables.md"));
        assert_eq!(config.max_call_depth, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let config =
            ConfigLoader::load_from_str(r#"{ "render_mode": "overlay", "debounce_ms": 40 }"#)
                .unwrap();
        assert_eq!(config.render_mode, RenderMode::Overlay);
        assert_eq!(config.debounce(), Duration::from_millis(40));
        assert_eq!(config.max_call_depth, 64);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ConfigLoader::load_from_str(r#"{ "debounce": 40 }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_call_depth_rejected() {
        let result = ConfigLoader::load_from_str(r#"{ "max_call_depth": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_excessive_call_depth_rejected() {
        let result = ConfigLoader::load_from_str(r#"{ "max_call_depth": 5000 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let at_limit = format!(r#"{{ "max_call_depth": {} }}"#, expr_core::MAX_CALL_DEPTH);
        assert_eq!(
            ConfigLoader::load_from_str(&at_limit).unwrap().max_call_depth,
            expr_core::MAX_CALL_DEPTH
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let result = ConfigLoader::load_from_path(dir.path().join(CONFIG_FILE_NAME));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
        assert_eq!(
            ConfigLoader::load_or_default(dir.path()).unwrap(),
            EngineConfig::default()
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = EngineConfig {
            render_mode: RenderMode::Overlay,
            overlay_anchor: OverlayAnchor::EndOfContent,
            ..EngineConfig::default()
        };
        ConfigLoader::save_to_path(&config, &path).unwrap();
        assert_eq!(ConfigLoader::load_from_path(&path).unwrap(), config);
    }
}
