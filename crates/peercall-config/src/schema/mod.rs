//! Configuration schema types for peercall.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod call;
mod identity;
mod relay;
mod server;
mod system;

pub use call::*;
pub use identity::*;
pub use relay::*;
pub use server::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration shared by the console client and the relay server.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeercallConfig {
    pub identity: IdentityConfig,
    pub relay: RelayConfig,
    pub call: CallConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: PeercallConfig = toml::from_str("").unwrap();
        assert_eq!(config.identity.name, "");
        assert_eq!(config.relay.connect_timeout, 15);
        assert_eq!(config.call.max_pending_candidates, 256);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: PeercallConfig = toml::from_str(
            r#"
[call]
answer_timeout = 0
"#,
        )
        .unwrap();
        assert_eq!(config.call.answer_timeout, 0);
        assert_eq!(config.call.max_pending_candidates, 256);
        assert!(!config.call.stun_servers.is_empty());
    }

    #[test]
    fn log_level_parses_lowercase() {
        let config: PeercallConfig = toml::from_str(
            r#"
[logging]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.level.as_directive(), "debug");
    }
}
