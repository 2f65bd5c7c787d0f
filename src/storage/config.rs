//! Configuration Management
//!
//! Handles reading and writing the application configuration file. JSON is
//! the default format; files ending in `.toml` are read and written as TOML.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_app_dir};

/// On-disk configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Configuration service for managing app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Create a new config service, loading existing config or creating defaults
    pub fn new() -> AppResult<Self> {
        ensure_app_dir()?;

        let config_path = config_path()?;
        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load an explicit config file; it must exist.
    pub fn from_path(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if !config_path.exists() {
            return Err(AppError::not_found(format!(
                "config file {}",
                config_path.display()
            )));
        }
        let config = Self::load_from_file(&config_path)?;
        Ok(Self {
            config_path,
            config,
        })
    }

    /// Use `path` when given, the default location otherwise
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::new(),
        }
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };
        config.validate().map_err(AppError::validation)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(config)?,
            ConfigFormat::Toml => toml::to_string_pretty(config)
                .map_err(|e| AppError::config(e.to_string()))?,
        };
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Path of the backing file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Apply overrides in memory; the file is left untouched.
    pub fn apply_overrides(&mut self, update: SettingsUpdate) -> AppResult<&AppConfig> {
        self.config.apply_update(update);
        self.config.validate().map_err(AppError::validation)?;
        Ok(&self.config)
    }
}
