use serde::{Deserialize, Serialize};

/// Relay server listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Seconds a new connection has to register with `store_user`.
    pub register_timeout: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
            register_timeout: 10,
        }
    }
}
