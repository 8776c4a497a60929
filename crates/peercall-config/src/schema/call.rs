//! Call negotiation settings.

use serde::{Deserialize, Serialize};

/// Call behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Seconds an outgoing call waits to connect. 0 disables the timeout.
    pub answer_timeout: u32,
    /// Upper bound on remote ICE candidates queued before the remote
    /// description is applied (valid range: 1-4096).
    pub max_pending_candidates: u32,
    /// STUN/TURN server URLs handed to the peer connection.
    pub stun_servers: Vec<String>,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            answer_timeout: 30,
            max_pending_candidates: 256,
            stun_servers: vec!["stun:stun.l.google.com:19302".into()],
        }
    }
}
