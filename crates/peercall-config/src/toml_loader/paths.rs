//! Where the config file lives, and writing the starter file.

use std::path::{Path, PathBuf};

use peercall_common::ConfigError;

use super::template::default_config_toml;

const APP_DIR: &str = "peercall";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/peercall/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the commented starter config to `path`. An existing file is kept.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_failure("create", dir, e))?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| io_failure("write", path, e))?;
    tracing::info!(path = %path.display(), "Wrote default config");
    Ok(())
}

pub(super) fn io_failure(action: &str, path: &Path, e: std::io::Error) -> ConfigError {
    ConfigError::ParseError(format!("cannot {action} {}: {e}", path.display()))
}
