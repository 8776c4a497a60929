use serde::{Deserialize, Serialize};

/// Configuration for the client's connection to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// WebSocket URL of the relay server.
    pub url: String,
    /// Seconds to wait for the WebSocket handshake (valid range: 1-120).
    pub connect_timeout: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000".into(),
            connect_timeout: 15,
        }
    }
}
