//! Configuration for the filter engine
//!
//! Settings are kept in a TOML file with one table per concern:
//!
//! ```toml
//! [compiler]
//! max_depth = 32
//! max_limit = 500
//!
//! [logging]
//! level = "Info"
//! format = "Text"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiphonConfig {
    /// Compiler settings
    #[serde(default)]
    pub compiler: CompilerSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Deepest input nesting accepted by the compiler
    pub max_depth: usize,
    /// Largest accepted `limit` (None for no cap)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<u64>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_limit: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: LogLevel,
    /// Log format
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl SiphonConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: SiphonConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise write and return the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        info!(path = %path.display(), "Wrote default configuration");
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.compiler.max_depth == 0 {
            return Err(anyhow::anyhow!("Compiler max depth cannot be 0"));
        }

        if self.compiler.max_limit == Some(0) {
            return Err(anyhow::anyhow!("Compiler max limit cannot be 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SiphonConfig::default();
        assert_eq!(config.compiler.max_depth, 32);
        assert_eq!(config.compiler.max_limit, None);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SiphonConfig::default();
        assert!(config.validate().is_ok());

        config.compiler.max_depth = 0;
        assert!(config.validate().is_err());

        config.compiler.max_depth = 8;
        config.compiler.max_limit = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("conf").join("siphon.toml");

        let mut config = SiphonConfig::default();
        config.compiler.max_limit = Some(100);
        config.logging.format = LogFormat::Json;
        config.save(&config_path).unwrap();

        let loaded = SiphonConfig::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("siphon.toml");

        let config = SiphonConfig::load_or_default(&config_path).unwrap();
        assert!(config_path.exists());
        assert_eq!(config, SiphonConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("siphon.toml");
        std::fs::write(&config_path, "[compiler]\nmax_depth = 4\n").unwrap();

        let config = SiphonConfig::load(&config_path).unwrap();
        assert_eq!(config.compiler.max_depth, 4);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("siphon.toml");
        std::fs::write(&config_path, "[compiler]\nmax_depth = 0\n").unwrap();

        assert!(SiphonConfig::load(&config_path).is_err());
    }
}
