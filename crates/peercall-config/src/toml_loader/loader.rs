use std::io::ErrorKind;
use std::path::Path;

use peercall_common::ConfigError;
use tracing::{debug, info, warn};

use super::paths::{create_default_config, default_config_path, io_failure};
use crate::schema::PeercallConfig;
use crate::validation;

/// Parse TOML text. Absent sections and keys take their defaults.
pub fn parse(text: &str) -> Result<PeercallConfig, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Read and parse `path`.
///
/// Out-of-range values are reported with `warn!` but still returned;
/// [`crate::load_config`] is the entry point that rejects them.
pub fn load_from_path(path: &Path) -> Result<PeercallConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(io_failure("read", path, e)),
    };

    let config = parse(&text)?;
    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "{e}");
    }

    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load from [`default_config_path`], writing the starter file first if
/// there is none.
pub fn load_default() -> Result<PeercallConfig, ConfigError> {
    let path = default_config_path()?;

    load_from_path(&path).or_else(|e| match e {
        ConfigError::FileNotFound(_) => {
            info!(path = %path.display(), "No config file, using defaults");
            create_default_config(&path)?;
            Ok(PeercallConfig::default())
        }
        other => Err(other),
    })
}
