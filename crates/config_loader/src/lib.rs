//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Apply `HUB_NAME` / `HUB_CONNECTION` environment overrides
//! - Validate configuration legality
//! - Produce a `HubConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("hub.toml")).unwrap();
//! println!("Hub: {:?}", config.name);
//! ```

mod parser;
mod validator;

pub use contracts::HubConfig;
pub use parser::ConfigFormat;
pub use validator::warnings;

use contracts::ContractError;
use std::path::Path;
use tracing::debug;

/// Environment variable overriding `name`
pub const ENV_HUB_NAME: &str = "HUB_NAME";

/// Environment variable overriding `connection`
pub const ENV_HUB_CONNECTION: &str = "HUB_CONNECTION";

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<HubConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<HubConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Load from an optional file, then apply process environment overrides
    ///
    /// Without a file the defaults are used, so a bare environment is enough
    /// to configure a live hub.
    pub fn load(path: Option<&Path>) -> Result<HubConfig, ContractError> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => HubConfig::default(),
        };
        Self::with_overrides(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from a lookup (usually the process environment)
    ///
    /// Empty values are ignored. The result is re-validated.
    pub fn with_overrides<F>(mut config: HubConfig, lookup: F) -> Result<HubConfig, ContractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(name) = present(ENV_HUB_NAME) {
            debug!(name = %name, "Hub name overridden from environment");
            config.name = Some(name);
        }
        if let Some(connection) = present(ENV_HUB_CONNECTION) {
            debug!("Hub connection overridden from environment");
            config.connection = Some(connection);
        }

        validator::validate(&config)?;
        Ok(config)
    }

    /// Serialize HubConfig to TOML string
    pub fn to_toml(config: &HubConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize HubConfig to JSON string
    pub fn to_json(config: &HubConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<HubConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
name = "telemetry"
connection = "Endpoint=udp://127.0.0.1:9000;MaxBatchBytes=1024"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.name.as_deref(), Some("telemetry"));
        assert_eq!(config.flush_interval_ms, 1000);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config, config2);
    }

    #[test]
    fn test_json_from_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.connection, config2.connection);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
name = "telemetry"
flush_interval_ms = 0
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("flush_interval_ms"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert!(config.is_live());
    }

    #[test]
    fn test_load_from_path_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let env = HashMap::from([
            (ENV_HUB_NAME, "from-env".to_string()),
            (ENV_HUB_CONNECTION, String::new()),
        ]);
        let base = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();

        let config = ConfigLoader::with_overrides(base, |k| env.get(k).cloned()).unwrap();

        assert_eq!(config.name.as_deref(), Some("from-env"));
        // empty override leaves the file value alone
        assert_eq!(
            config.connection.as_deref(),
            Some("Endpoint=udp://127.0.0.1:9000;MaxBatchBytes=1024")
        );
    }

    #[test]
    fn test_overrides_enable_live_mode() {
        let env = HashMap::from([
            (ENV_HUB_NAME, "hub".to_string()),
            (ENV_HUB_CONNECTION, "Endpoint=udp://127.0.0.1:9000".to_string()),
        ]);
        let config =
            ConfigLoader::with_overrides(HubConfig::default(), |k| env.get(k).cloned()).unwrap();
        assert!(config.is_live());
    }
}
