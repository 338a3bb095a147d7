//! Configuration management for Orca Card
//!
//! Handles loading, saving, and managing configuration.
//! Configuration is persisted as JSON in the platform configuration directory.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier following reverse-DNS convention
pub const APP_ID: &str = "com.orca.Card";

/// Output width of exported cards in pixels
pub const DEFAULT_TARGET_WIDTH: u32 = 1080;

/// Maximum height of a single exported slice in rendered pixels
pub const DEFAULT_MAX_SLICE_HEIGHT: u32 = 8000;

/// Rendered height above which the user is offered a split export
pub const DEFAULT_SPLIT_THRESHOLD: u32 = 10_000;

/// Pause between consecutive slice captures in milliseconds
pub const DEFAULT_INTER_CAPTURE_DELAY_MS: u64 = 300;

/// Debounce window for autosave in milliseconds
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 500;

/// Maximum number of import history entries kept
pub const MAX_IMPORT_HISTORY: usize = 50;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image export configuration
    pub export: ExportConfig,

    /// Text normalization configuration
    pub text: TextConfig,

    /// Persistence configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the default location or return defaults
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_dir()?.join("config.json");
        Self::load_from(&path)
    }

    /// Load configuration from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveError(e.to_string()))
    }

    /// Reject values the exporter cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        let export = &self.export;
        if export.target_width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.target_width".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if export.max_slice_height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.max_slice_height".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if export.pixel_ratio <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "export.pixel_ratio".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Get the data directory path (for the stored document)
    pub fn data_dir() -> ConfigResult<PathBuf> {
        dirs::data_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }
}

/// Image export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Fixed output width in pixels
    pub target_width: u32,

    /// Maximum height of one slice in rendered pixels
    pub max_slice_height: u32,

    /// Rendered height above which split export is offered
    pub split_threshold: u32,

    /// Device pixel ratio used for whole-card exports
    pub pixel_ratio: f64,

    /// Pause between slice captures in milliseconds
    pub inter_capture_delay_ms: u64,

    /// Image file extension for exported slices
    pub image_extension: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            max_slice_height: DEFAULT_MAX_SLICE_HEIGHT,
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
            pixel_ratio: 2.0,
            inter_capture_delay_ms: DEFAULT_INTER_CAPTURE_DELAY_MS,
            image_extension: "png".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn inter_capture_delay(&self) -> Duration {
        Duration::from_millis(self.inter_capture_delay_ms)
    }
}

/// Text normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Normalize spacing when the editor loses focus
    pub normalize_on_blur: bool,

    /// Normalize spacing before every export
    pub normalize_before_export: bool,

    /// Strip AI citation markers when importing text
    pub clean_citations: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            normalize_on_blur: true,
            normalize_before_export: true,
            clean_citations: true,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Enable autosave
    pub autosave_enabled: bool,

    /// Autosave debounce window in milliseconds
    pub autosave_delay_ms: u64,

    /// Maximum import history entries to keep
    pub max_import_history: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            max_import_history: MAX_IMPORT_HISTORY,
        }
    }
}

impl StorageConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.export.target_width, 1080);
        assert_eq!(config.export.max_slice_height, 8000);
        assert!(config.export.split_threshold > config.export.max_slice_height);
        assert!(config.text.normalize_before_export);
        assert!(config.storage.autosave_enabled);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.export.pixel_ratio, deserialized.export.pixel_ratio);
        assert_eq!(
            config.storage.autosave_delay_ms,
            deserialized.storage.autosave_delay_ms
        );
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"export": {"max_slice_height": 4000}}"#).unwrap();
        assert_eq!(config.export.max_slice_height, 4000);
        assert_eq!(config.export.target_width, DEFAULT_TARGET_WIDTH);
        assert!(config.text.clean_citations);
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let mut config = Config::default();
        config.export.target_width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config.export.target_width, DEFAULT_TARGET_WIDTH);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.export.inter_capture_delay_ms = 50;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.export.inter_capture_delay(), Duration::from_millis(50));
    }
}
