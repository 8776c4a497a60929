//! WebSocket transport to the signaling relay.
//!
//! [`RelaySession`] opens the connection, registers the local identity with
//! `store_user`, and hands inbound envelopes to a single receiver. Decode
//! failures are logged and dropped. A dropped connection is reported once as
//! [`RelayEvent::Closed`] and is never reconnected automatically.

mod client;
mod connection;
mod types;

#[cfg(test)]
mod tests;

pub use client::RelaySession;
pub use types::{RelayConfig, RelayEvent, RelayState};

use async_trait::async_trait;
use peercall_common::RelayError;

use crate::protocol::Envelope;

/// Outbound half of a relay, as seen by the call driver.
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    async fn send(&self, envelope: &Envelope) -> Result<(), RelayError>;
    async fn close(&self);
}
