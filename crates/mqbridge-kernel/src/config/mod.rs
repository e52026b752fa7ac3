//! Routes document loader
//!
//! Loads a [`BridgeConfig`] from YAML, TOML or JSON and validates it before
//! anything else in the process is started.
//!
//! ## Features
//!
//! - Auto-detection of format from file extension
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax)
//! - Load-time validation of every route definition

use crate::error::ConfigError;
use crate::validation::BridgeConfig;
use config::{Config as Cfg, File};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;

pub use config::FileFormat;


/// Failure to turn a routes document into a validated [`BridgeConfig`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}

/// Result type for loader operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Detect configuration format from file extension
///
/// # Supported Extensions
///
/// - YAML: `.yaml`, `.yml`
/// - TOML: `.toml`
/// - JSON: `.json`
pub fn detect_format(path: &str) -> LoadResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| LoadError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(LoadError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string
///
/// Supports both `${VAR_NAME}` and `$VAR_NAME` syntax. References to unset
/// variables are left untouched.
///
/// # Example
///
/// ```rust,ignore
/// use mqbridge_kernel::config::substitute_env_vars;
///
/// std::env::set_var("MQTT_BROKER", "broker.local");
/// let result = substitute_env_vars("broker: ${MQTT_BROKER}")?;
/// assert_eq!(result, "broker: broker.local");
/// ```
pub fn substitute_env_vars(content: &str) -> LoadResult<String> {
    // ${VAR_NAME} first so the braces are consumed before the bare form runs
    let re_braced = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| LoadError::Parse(e.to_string()))?;
    let result = re_braced.replace_all(content, lookup_env).to_string();

    let re_simple = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b")
        .map_err(|e| LoadError::Parse(e.to_string()))?;
    Ok(re_simple.replace_all(&result, lookup_env).to_string())
}

fn lookup_env(caps: &regex::Captures<'_>) -> String {
    std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
}

/// Deserialize a document from a string with an explicit format.
pub fn from_str<T>(content: &str, format: FileFormat) -> LoadResult<T>
where
    T: DeserializeOwned,
{
    let substituted = substitute_env_vars(content)?;

    let config = Cfg::builder()
        .add_source(File::from_str(&substituted, format))
        .build()
        .map_err(|e| LoadError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| LoadError::Serialization(e.to_string()))
}

/// Deserialize a document from a file, detecting the format from its
/// extension.
pub fn load_config<T>(path: &str) -> LoadResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    from_str(&content, format)
}

/// Parse and validate a routes document held in memory.
pub fn parse_bridge_config(content: &str, format: FileFormat) -> LoadResult<BridgeConfig> {
    let config: BridgeConfig = from_str(content, format)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate the routes document at `path`.
///
/// # Example
///
/// ```rust,ignore
/// use mqbridge_kernel::config::load_bridge_config;
///
/// let config = load_bridge_config("config/routes.yaml")?;
/// println!("{} routes", config.routes.len());
/// ```
pub fn load_bridge_config(path: &str) -> LoadResult<BridgeConfig> {
    let config: BridgeConfig = load_config(path)?;
    config.validate()?;
    tracing::debug!(path, routes = config.routes.len(), "Loaded routes document");
    Ok(config)
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("routes.yaml").unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format("routes.yml").unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format("routes.toml").unwrap(), FileFormat::Toml);
        assert_eq!(detect_format("routes.json").unwrap(), FileFormat::Json);
        assert!(detect_format("routes.txt").is_err());
        assert!(detect_format("routes").is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        unsafe {
            std::env::set_var("MQB_UNIT_BROKER", "broker.local");
        }
        let out = substitute_env_vars("a: ${MQB_UNIT_BROKER}\nb: $MQB_UNIT_BROKER").unwrap();
        assert_eq!(out, "a: broker.local\nb: broker.local");
        unsafe {
            std::env::remove_var("MQB_UNIT_BROKER");
        }
    }

    #[test]
    fn test_unset_env_var_is_left_untouched() {
        let out = substitute_env_vars("k: ${MQB_UNIT_SURELY_UNSET_VAR}").unwrap();
        assert_eq!(out, "k: ${MQB_UNIT_SURELY_UNSET_VAR}");
    }
}
