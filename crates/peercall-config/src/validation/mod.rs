//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator runs them all and
//! collects errors into a single `ConfigError`.

mod helpers;
mod sections;

#[cfg(test)]
mod tests;

use crate::schema::PeercallConfig;
use peercall_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PeercallConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_identity(&mut errors, config);
    sections::validate_relay(&mut errors, config);
    sections::validate_call(&mut errors, config);
    sections::validate_server(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
