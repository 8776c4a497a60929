//! Call state machine and the async driver around it.
//!
//! The [`CallController`] decides; the [`CallClient`] driver carries out
//! its decisions against the relay, the negotiation engine and local media.

mod controller;
mod driver;
mod types;


pub use controller::CallController;
pub use driver::{CallClient, CallHandle, EngineObserver};
pub use types::{
    CallCommand, CallConfig, CallEvent, CallInput, CallSession, Completion, CreateResult, Effect,
    EngineOp, MediaOp, Phase, Role, SetResult,
};
