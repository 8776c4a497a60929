//! Inputs, effects and session state for the call state machine.

use std::collections::VecDeque;
use std::time::Duration;

use peercall_common::CallError;

use crate::protocol::{Envelope, IceCandidate, SessionDescription};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CallConfig {
    /// How long an outgoing call may stay unconnected. `None` waits forever.
    pub answer_timeout: Option<Duration>,
    /// Cap on remote candidates held before the remote description is set.
    pub max_pending_candidates: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            answer_timeout: Some(Duration::from_secs(30)),
            max_pending_candidates: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase and Role
// ---------------------------------------------------------------------------

/// Position of the current call in the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// `start_call` sent, waiting for the relay's `call_response`.
    Calling,
    /// An offer arrived and the user has not decided yet.
    IncomingOffer,
    Negotiating,
    Connected,
    /// Transient; the session is reset to `Idle` in the same step.
    Ended,
}

impl Phase {
    /// Local media controls only do something in these phases.
    pub fn has_media(self) -> bool {
        matches!(self, Phase::Negotiating | Phase::Connected)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Calling => "calling",
            Phase::IncomingOffer => "incoming offer",
            Phase::Negotiating => "negotiating",
            Phase::Connected => "connected",
            Phase::Ended => "ended",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sent `start_call` and will create the offer.
    Caller,
    /// Received the offer and will create the answer.
    Callee,
}

// ---------------------------------------------------------------------------
// Commands and Events
// ---------------------------------------------------------------------------

/// Local user actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallCommand {
    StartCall(String),
    Accept,
    Reject,
    HangUp,
    SetMuted(bool),
    SetVideoPaused(bool),
    SwitchCamera,
}

/// Outward notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    CallFailed(CallError),
    IncomingCall { from: String },
    CallConnected { peer: String },
    CallEnded { peer: String },
    /// The relay transport dropped; no further calls can be placed.
    RelayDisconnected { reason: String },
}

// ---------------------------------------------------------------------------
// Engine completions
// ---------------------------------------------------------------------------

/// Result of `create_offer` / `create_answer`.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateResult {
    Success(SessionDescription),
    Failure(String),
}

impl From<Result<SessionDescription, String>> for CreateResult {
    fn from(result: Result<SessionDescription, String>) -> Self {
        match result {
            Ok(description) => CreateResult::Success(description),
            Err(reason) => CreateResult::Failure(reason),
        }
    }
}

/// Result of the engine operations that produce no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetResult {
    Success,
    Failure(String),
}

impl From<Result<(), String>> for SetResult {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => SetResult::Success,
            Err(reason) => SetResult::Failure(reason),
        }
    }
}

/// A finished engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    OfferCreated(CreateResult),
    AnswerCreated(CreateResult),
    LocalDescriptionSet(SetResult),
    RemoteDescriptionSet(SetResult),
    CandidateAdded(SetResult),
}

// ---------------------------------------------------------------------------
// Inputs and Effects
// ---------------------------------------------------------------------------

/// Everything that can move the state machine, funneled through one queue.
#[derive(Debug, Clone, PartialEq)]
pub enum CallInput {
    Command(CallCommand),
    Envelope(Envelope),
    Completion {
        generation: u64,
        completion: Completion,
    },
    /// The engine gathered a local ICE candidate on the peer connection
    /// built for `generation`.
    LocalCandidate {
        generation: u64,
        candidate: IceCandidate,
    },
    /// The peer connection built for `generation` closed or failed.
    ConnectionClosed {
        generation: u64,
    },
    CaptureFailed {
        generation: u64,
        reason: String,
    },
    Timeout {
        generation: u64,
    },
    RelayClosed {
        reason: String,
    },
    /// Send the next buffered local candidate.
    DrainOutbound {
        generation: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineOp {
    CreateOffer,
    CreateAnswer,
    SetLocalDescription(SessionDescription),
    SetRemoteDescription(SessionDescription),
    AddCandidate(IceCandidate),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOp {
    StartCapture,
    StopCapture,
    SetAudioEnabled(bool),
    SetVideoEnabled(bool),
    SwitchCamera,
}

/// Work requested by one step of the state machine, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(Envelope),
    Engine { generation: u64, op: EngineOp },
    Media { generation: u64, op: MediaOp },
    Notify(CallEvent),
    ArmTimeout { generation: u64, after: Duration },
    /// Feed an input back into the queue behind whatever is already there.
    Enqueue(CallInput),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State of the one call a controller can hold. Reset wholesale when a call
/// ends.
#[derive(Debug, Clone, Default)]
pub struct CallSession {
    pub remote_identity: Option<String>,
    pub phase: Phase,
    pub role: Option<Role>,
    /// Remote candidates waiting for the remote description, in arrival order.
    pub pending_candidates: VecDeque<IceCandidate>,
    pub media_muted: bool,
    pub video_paused: bool,

    pub(crate) remote_offer: Option<SessionDescription>,
    /// Created by the engine, waiting for `set_local_description`.
    pub(crate) local_description: Option<SessionDescription>,
    pub(crate) remote_description_requested: bool,
    pub(crate) remote_description_set: bool,
    pub(crate) local_description_sent: bool,
    /// Local candidates gathered before our description went out.
    pub(crate) outbound_candidates: VecDeque<IceCandidate>,
    pub(crate) engine_active: bool,
}

impl CallSession {
    pub(crate) fn begin(role: Role, remote: &str, phase: Phase) -> Self {
        Self {
            remote_identity: Some(remote.to_string()),
            phase,
            role: Some(role),
            ..Self::default()
        }
    }

    pub fn remote(&self) -> &str {
        self.remote_identity.as_deref().unwrap_or("")
    }

    pub(crate) fn is_from_remote(&self, name: &str) -> bool {
        self.remote_identity.as_deref() == Some(name)
    }
}
