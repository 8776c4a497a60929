//! Configuration, state and event/command enums for the relay session.

use std::time::Duration;

use crate::protocol::Envelope;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where and how to reach the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// `ws://` or `wss://` endpoint.
    pub url: String,
    /// Upper bound on the WebSocket handshake.
    pub connect_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000".to_string(),
            connect_timeout: Duration::from_secs(15),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of a relay session. Transitions only move forward, except that
/// a failed connect falls back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closed,
}

// ---------------------------------------------------------------------------
// Events and Commands
// ---------------------------------------------------------------------------

/// Events delivered by the relay session.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// A successfully decoded inbound envelope.
    Envelope(Envelope),
    /// The transport dropped. Not emitted after a local `close()`.
    Closed { reason: String },
}

/// Commands sent to the background connection task.
#[derive(Debug)]
pub(crate) enum RelayCommand {
    Send(String),
    Close,
}
