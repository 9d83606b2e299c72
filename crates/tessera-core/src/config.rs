//! Configuration loading
//!
//! Component configs (`DpopConfig`, `OpaqueTokenConfig`) are plain serde
//! structs. This module layers a file (TOML, YAML or JSON) under environment
//! overrides and deserializes the result into any of them.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;

pub use config::FileFormat;

/// Default prefix for environment overrides (`TESSERA__DPOP__FRESHNESS_WINDOW_SECS=30`)
pub const DEFAULT_ENV_PREFIX: &str = "TESSERA";

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Configuration parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),
}

fn format_for(path: &Path) -> Result<FileFormat, ConfigError> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => Ok(FileFormat::Toml),
        Some("yaml" | "yml") => Ok(FileFormat::Yaml),
        Some("json") => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

/// Load `T` from `path`, with `{env_prefix}__`-prefixed environment variables
/// overriding file settings (`__` separates nested keys)
///
/// # Errors
///
/// Returns an error if:
/// - The file doesn't exist
/// - The file format is unsupported
/// - The merged configuration does not deserialize into `T`
pub fn load<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    env_prefix: &str,
) -> Result<T, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let format = format_for(path)?;
    let path_str = path.to_str().ok_or(ConfigError::UnsupportedFormat)?;

    let config = Config::builder()
        .add_source(File::new(path_str, format))
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    tracing::debug!(path = %path.display(), env_prefix, "Loaded configuration");

    Ok(config.try_deserialize()?)
}

/// Deserialize `T` from an in-memory document, without environment overrides
///
/// # Errors
/// Returns [`ConfigError::ParseError`] if the document is invalid for `T`
pub fn from_str<T: DeserializeOwned>(content: &str, format: FileFormat) -> Result<T, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(content, format))
        .build()?;
    Ok(config.try_deserialize()?)
}
