//! Signaling core for peer-to-peer calls.
//!
//! - [`protocol`]: the JSON envelope carried over the relay.
//! - [`relay`]: WebSocket session to the relay server.
//! - [`engine`]: capabilities the embedding app supplies (peer connection,
//!   local media).
//! - [`call`]: the call state machine and its async driver.

pub mod call;
pub mod engine;
pub mod protocol;
pub mod relay;

pub use call::{CallClient, CallCommand, CallConfig, CallController, CallEvent, CallHandle, Phase};
pub use engine::{LocalMedia, NegotiationEngine};
pub use protocol::{Envelope, IceCandidate, MessageType, SessionDescription, Signal, WireEnvelope};
pub use relay::{EnvelopeSink, RelayConfig, RelayEvent, RelaySession, RelayState};
