//! # Config Loader
//!
//! Codec configuration loading.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `CodecConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("codec.toml")).unwrap();
//! println!("Namespace: {}", config.linked_data.namespace);
//! ```

mod parser;
mod validation;

pub use parser::ConfigFormat;
pub use representation::CodecConfig;

use representation::{EmissorError, Result};
use std::path::Path;
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Detects the format from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<CodecConfig> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), ?format, "loading codec config");
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<CodecConfig> {
        let config = parser::parse(content, format)?;
        validation::validate(&config)?;
        Ok(config)
    }

    pub fn to_toml(config: &CodecConfig) -> Result<String> {
        toml::to_string_pretty(config)
            .map_err(|e| EmissorError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &CodecConfig) -> Result<String> {
        serde_json::to_string_pretty(config)
            .map_err(|e| EmissorError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            EmissorError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| EmissorError::config_parse(format!("unsupported config format: .{ext}")))
    }
}
