//! Peercall configuration system.
//!
//! Provides TOML-based configuration for the console client and the relay
//! server. All config sections use sensible defaults so partial configs
//! work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use peercall_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    CallConfig, IdentityConfig, LogLevel, LoggingConfig, PeercallConfig, RelayConfig,
    ServerConfig, CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use peercall_common::ConfigError;

/// Load config from an explicit path, or from the platform default path
/// when `path` is `None`, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<PeercallConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &PeercallConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = PeercallConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"identity\""));
        assert!(json.contains("\"relay\""));
        assert!(json.contains("\"call\""));
        assert!(json.contains("\"server\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = PeercallConfig::default();
        let json = config_to_json(&config);
        let parsed: PeercallConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.relay.url, "ws://127.0.0.1:3000");
        assert_eq!(parsed.server.port, 3000);
        assert_eq!(parsed.call.answer_timeout, 30);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[relay]
url = "http://example.com"
"#,
        )
        .unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("relay.url"));
    }
}
