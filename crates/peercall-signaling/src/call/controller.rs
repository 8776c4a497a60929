//! The call state machine.
//!
//! [`CallController::handle`] is a synchronous step: it takes one input,
//! updates the session, and returns the effects the driver must carry out.
//! It never performs I/O, so every ordering decision lives here and can be
//! tested without a runtime.

use peercall_common::CallError;
use tracing::{debug, info, warn};

use super::types::{
    CallCommand, CallConfig, CallEvent, CallInput, CallSession, Completion, CreateResult, Effect,
    EngineOp, MediaOp, Phase, Role, SetResult,
};
use crate::protocol::{Envelope, IceCandidate, SessionDescription, Signal, USER_NOT_ONLINE};

pub struct CallController {
    local_identity: String,
    config: CallConfig,
    session: CallSession,
    /// Bumped whenever a session leaves `Idle`. Completions and timers carry
    /// the generation they were issued under.
    generation: u64,
    relay_open: bool,
}

impl CallController {
    pub fn new(local_identity: impl Into<String>, config: CallConfig) -> Self {
        Self {
            local_identity: local_identity.into(),
            config,
            session: CallSession::default(),
            generation: 0,
            relay_open: true,
        }
    }

    pub fn local_identity(&self) -> &str {
        &self.local_identity
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn session(&self) -> &CallSession {
        &self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Process one input and return the effects to apply, in order.
    pub fn handle(&mut self, input: CallInput) -> Vec<Effect> {
        let mut effects = Vec::new();

        match input {
            CallInput::Command(command) => self.on_command(command, &mut effects),
            CallInput::Envelope(envelope) => self.on_envelope(envelope, &mut effects),
            CallInput::Completion {
                generation,
                completion,
            } => {
                if self.is_stale(generation) {
                    debug!(generation, current = self.generation, "Discarding stale engine completion");
                } else {
                    self.on_completion(completion, &mut effects);
                }
            }
            CallInput::LocalCandidate {
                generation,
                candidate,
            } => {
                if self.is_stale(generation) {
                    debug!(generation, current = self.generation, "Dropping local candidate from another call");
                } else {
                    self.on_local_candidate(candidate, &mut effects);
                }
            }
            CallInput::ConnectionClosed { generation } => {
                if self.is_stale(generation) {
                    debug!(generation, current = self.generation, "Ignoring closure of another call's connection");
                } else if self.session.engine_active {
                    info!(peer = %self.session.remote(), "Peer connection closed");
                    self.end(None, &mut effects);
                }
            }
            CallInput::CaptureFailed { generation, reason } => {
                if !self.is_stale(generation) {
                    self.end(Some(CallError::Media(reason)), &mut effects);
                }
            }
            CallInput::Timeout { generation } => {
                let waiting = self.session.role == Some(Role::Caller)
                    && matches!(self.session.phase, Phase::Calling | Phase::Negotiating);
                if !self.is_stale(generation) && waiting {
                    let peer = self.session.remote().to_string();
                    self.end(Some(CallError::NoAnswer(peer)), &mut effects);
                }
            }
            CallInput::RelayClosed { reason } => {
                self.relay_open = false;
                if self.session.phase != Phase::Idle {
                    self.end(Some(CallError::ConnectionLost(reason.clone())), &mut effects);
                }
                effects.push(Effect::Notify(CallEvent::RelayDisconnected { reason }));
            }
            CallInput::DrainOutbound { generation } => {
                if !self.is_stale(generation) {
                    self.drain_outbound(&mut effects);
                }
            }
        }

        effects
    }

    fn is_stale(&self, generation: u64) -> bool {
        generation != self.generation || self.session.phase == Phase::Idle
    }

    // -----------------------------------------------------------------------
    // Local commands
    // -----------------------------------------------------------------------

    fn on_command(&mut self, command: CallCommand, effects: &mut Vec<Effect>) {
        match command {
            CallCommand::StartCall(target) => self.start_call(target.trim(), effects),
            CallCommand::Accept => self.accept(effects),
            CallCommand::Reject => self.reject(),
            CallCommand::HangUp => match self.session.phase {
                Phase::Idle | Phase::Ended => debug!("Hang up with no active call"),
                Phase::IncomingOffer => self.reject(),
                _ => self.end(None, effects),
            },
            CallCommand::SetMuted(muted) => {
                if self.media_available() {
                    self.session.media_muted = muted;
                    self.push_media(MediaOp::SetAudioEnabled(!muted), effects);
                }
            }
            CallCommand::SetVideoPaused(paused) => {
                if self.media_available() {
                    self.session.video_paused = paused;
                    self.push_media(MediaOp::SetVideoEnabled(!paused), effects);
                }
            }
            CallCommand::SwitchCamera => {
                if self.media_available() {
                    self.push_media(MediaOp::SwitchCamera, effects);
                }
            }
        }
    }

    fn start_call(&mut self, target: &str, effects: &mut Vec<Effect>) {
        if self.session.phase != Phase::Idle {
            effects.push(Effect::Notify(CallEvent::CallFailed(CallError::Busy)));
            return;
        }
        if target.is_empty() || target == self.local_identity {
            effects.push(Effect::Notify(CallEvent::CallFailed(
                CallError::InvalidTarget(target.to_string()),
            )));
            return;
        }
        if !self.relay_open {
            effects.push(Effect::Notify(CallEvent::CallFailed(
                CallError::ConnectionLost("relay is closed".to_string()),
            )));
            return;
        }

        self.generation += 1;
        self.session = CallSession::begin(Role::Caller, target, Phase::Calling);
        info!(peer = %target, generation = self.generation, "Placing call");

        effects.push(Effect::Send(Envelope::start_call(&self.local_identity, target)));
        if let Some(after) = self.config.answer_timeout {
            effects.push(Effect::ArmTimeout {
                generation: self.generation,
                after,
            });
        }
    }

    fn accept(&mut self, effects: &mut Vec<Effect>) {
        if self.session.phase != Phase::IncomingOffer {
            debug!(phase = %self.session.phase, "No incoming call to accept");
            return;
        }
        let Some(offer) = self.session.remote_offer.take() else {
            warn!("Incoming call has no stored offer");
            return;
        };

        info!(peer = %self.session.remote(), "Accepting call");
        self.session.phase = Phase::Negotiating;
        self.session.engine_active = true;
        self.session.remote_description_requested = true;
        self.push_media(MediaOp::StartCapture, effects);
        self.push_engine(EngineOp::SetRemoteDescription(offer), effects);
    }

    fn reject(&mut self) {
        if self.session.phase != Phase::IncomingOffer {
            debug!(phase = %self.session.phase, "No incoming call to reject");
            return;
        }
        info!(peer = %self.session.remote(), "Rejecting call");
        self.session = CallSession::default();
    }

    fn media_available(&self) -> bool {
        let available = self.session.phase.has_media();
        if !available {
            debug!(phase = %self.session.phase, "Media control ignored outside a call");
        }
        available
    }

    // -----------------------------------------------------------------------
    // Inbound envelopes
    // -----------------------------------------------------------------------

    fn on_envelope(&mut self, envelope: Envelope, effects: &mut Vec<Effect>) {
        let Envelope {
            name,
            target,
            signal,
        } = envelope;

        if let Some(target) = target.as_deref() {
            if target != self.local_identity {
                warn!(from = %name, target = %target, "Ignoring envelope addressed to someone else");
                return;
            }
        }

        match signal {
            Signal::CallResponse(status) => self.on_call_response(&status, effects),
            Signal::OfferReceived(offer) => self.on_offer(name, offer, effects),
            Signal::AnswerReceived(answer) => self.on_answer(&name, answer, effects),
            Signal::IceCandidate(candidate) => self.on_remote_candidate(&name, candidate, effects),
            other => {
                warn!(kind = %other.message_type(), from = %name, "Ignoring relay-bound envelope");
            }
        }
    }

    fn on_call_response(&mut self, status: &str, effects: &mut Vec<Effect>) {
        if self.session.phase != Phase::Calling {
            debug!(phase = %self.session.phase, status, "Ignoring call_response");
            return;
        }

        if status == USER_NOT_ONLINE {
            let peer = self.session.remote().to_string();
            self.end(Some(CallError::TargetUnavailable(peer)), effects);
            return;
        }

        info!(peer = %self.session.remote(), "Peer is online, creating offer");
        self.session.phase = Phase::Negotiating;
        self.session.engine_active = true;
        self.push_media(MediaOp::StartCapture, effects);
        self.push_engine(EngineOp::CreateOffer, effects);
    }

    fn on_offer(&mut self, from: String, offer: SessionDescription, effects: &mut Vec<Effect>) {
        if self.session.phase != Phase::Idle {
            warn!(from = %from, phase = %self.session.phase, "Ignoring offer while busy");
            return;
        }
        if from.is_empty() || from == self.local_identity {
            warn!(from = %from, "Ignoring offer with invalid sender");
            return;
        }

        self.generation += 1;
        self.session = CallSession::begin(Role::Callee, &from, Phase::IncomingOffer);
        // The envelope type decides the role, not the descriptor.
        self.session.remote_offer = Some(SessionDescription::offer(offer.sdp));
        info!(from = %from, generation = self.generation, "Incoming call");

        effects.push(Effect::Notify(CallEvent::IncomingCall { from }));
    }

    fn on_answer(&mut self, from: &str, answer: SessionDescription, effects: &mut Vec<Effect>) {
        if !self.session.is_from_remote(from) {
            warn!(from = %from, "Ignoring answer from a peer not in this call");
            return;
        }
        let expecting = self.session.role == Some(Role::Caller)
            && self.session.phase == Phase::Negotiating
            && self.session.local_description_sent
            && !self.session.remote_description_requested;
        if !expecting {
            warn!(from = %from, phase = %self.session.phase, "Ignoring unexpected answer");
            return;
        }

        debug!(from = %from, "Applying remote answer");
        self.session.remote_description_requested = true;
        self.push_engine(
            EngineOp::SetRemoteDescription(SessionDescription::answer(answer.sdp)),
            effects,
        );
    }

    fn on_remote_candidate(&mut self, from: &str, candidate: IceCandidate, effects: &mut Vec<Effect>) {
        if self.session.phase == Phase::Idle {
            debug!(from = %from, "Dropping candidate with no active call");
            return;
        }
        if !self.session.is_from_remote(from) {
            warn!(from = %from, "Ignoring candidate from a peer not in this call");
            return;
        }

        if self.session.remote_description_set {
            self.push_engine(EngineOp::AddCandidate(candidate), effects);
        } else if self.session.pending_candidates.len() >= self.config.max_pending_candidates {
            warn!(
                from = %from,
                limit = self.config.max_pending_candidates,
                "Candidate queue full, dropping candidate"
            );
        } else {
            self.session.pending_candidates.push_back(candidate);
            debug!(queued = self.session.pending_candidates.len(), "Queued remote candidate");
        }
    }

    // -----------------------------------------------------------------------
    // Engine completions
    // -----------------------------------------------------------------------

    fn on_completion(&mut self, completion: Completion, effects: &mut Vec<Effect>) {
        match completion {
            Completion::OfferCreated(result) | Completion::AnswerCreated(result) => match result {
                CreateResult::Success(description) => {
                    self.session.local_description = Some(description.clone());
                    self.push_engine(EngineOp::SetLocalDescription(description), effects);
                }
                CreateResult::Failure(reason) => self.fail_negotiation(reason, effects),
            },
            Completion::LocalDescriptionSet(SetResult::Success) => {
                self.on_local_description_set(effects)
            }
            Completion::RemoteDescriptionSet(SetResult::Success) => {
                self.on_remote_description_set(effects)
            }
            Completion::LocalDescriptionSet(SetResult::Failure(reason))
            | Completion::RemoteDescriptionSet(SetResult::Failure(reason)) => {
                self.fail_negotiation(reason, effects)
            }
            Completion::CandidateAdded(SetResult::Success) => {}
            Completion::CandidateAdded(SetResult::Failure(reason)) => {
                warn!(error = %reason, "Engine rejected remote candidate");
            }
        }
    }

    /// Our description is committed, so it can go out. Only now, never on
    /// the create step.
    fn on_local_description_set(&mut self, effects: &mut Vec<Effect>) {
        let Some(description) = self.session.local_description.take() else {
            warn!("Local description set without a pending description");
            return;
        };
        let peer = self.session.remote().to_string();
        self.session.local_description_sent = true;

        match self.session.role {
            Some(Role::Caller) => {
                info!(peer = %peer, "Sending offer");
                effects.push(Effect::Send(Envelope::create_offer(
                    &self.local_identity,
                    &peer,
                    description,
                )));
            }
            Some(Role::Callee) => {
                info!(peer = %peer, "Sending answer");
                effects.push(Effect::Send(Envelope::create_answer(
                    &self.local_identity,
                    &peer,
                    description,
                )));
                self.session.phase = Phase::Connected;
                effects.push(Effect::Notify(CallEvent::CallConnected { peer }));
            }
            None => {}
        }

        if !self.session.outbound_candidates.is_empty() {
            effects.push(Effect::Enqueue(CallInput::DrainOutbound {
                generation: self.generation,
            }));
        }
    }

    fn on_remote_description_set(&mut self, effects: &mut Vec<Effect>) {
        self.session.remote_description_set = true;

        match self.session.role {
            Some(Role::Callee) => self.push_engine(EngineOp::CreateAnswer, effects),
            Some(Role::Caller) => {
                let peer = self.session.remote().to_string();
                info!(peer = %peer, "Call connected");
                self.session.phase = Phase::Connected;
                effects.push(Effect::Notify(CallEvent::CallConnected { peer }));
            }
            None => {}
        }

        let pending: Vec<IceCandidate> = self.session.pending_candidates.drain(..).collect();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Applying queued remote candidates");
        }
        for candidate in pending {
            self.push_engine(EngineOp::AddCandidate(candidate), effects);
        }
    }

    fn fail_negotiation(&mut self, reason: String, effects: &mut Vec<Effect>) {
        self.end(Some(CallError::Negotiation(reason)), effects);
    }

    // -----------------------------------------------------------------------
    // Local candidates
    // -----------------------------------------------------------------------

    fn on_local_candidate(&mut self, candidate: IceCandidate, effects: &mut Vec<Effect>) {
        // Candidates must not overtake the description they belong to.
        if self.session.local_description_sent && self.session.outbound_candidates.is_empty() {
            let peer = self.session.remote().to_string();
            effects.push(Effect::Send(Envelope::ice_candidate(
                &self.local_identity,
                &peer,
                candidate,
            )));
        } else {
            self.session.outbound_candidates.push_back(candidate);
        }
    }

    /// Send one buffered local candidate per step.
    fn drain_outbound(&mut self, effects: &mut Vec<Effect>) {
        let Some(candidate) = self.session.outbound_candidates.pop_front() else {
            return;
        };
        let peer = self.session.remote().to_string();
        effects.push(Effect::Send(Envelope::ice_candidate(
            &self.local_identity,
            &peer,
            candidate,
        )));

        if !self.session.outbound_candidates.is_empty() {
            effects.push(Effect::Enqueue(CallInput::DrainOutbound {
                generation: self.generation,
            }));
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Close whatever the call opened, report the outcome, and return to
    /// `Idle`.
    fn end(&mut self, failure: Option<CallError>, effects: &mut Vec<Effect>) {
        let peer = self.session.remote().to_string();
        self.session.phase = Phase::Ended;

        if self.session.engine_active {
            self.push_engine(EngineOp::Close, effects);
            self.push_media(MediaOp::StopCapture, effects);
        }

        match failure {
            Some(error) => {
                warn!(peer = %peer, error = %error, "Call failed");
                effects.push(Effect::Notify(CallEvent::CallFailed(error)));
            }
            None => {
                info!(peer = %peer, "Call ended");
                effects.push(Effect::Notify(CallEvent::CallEnded { peer }));
            }
        }

        self.session = CallSession::default();
    }

    fn push_engine(&self, op: EngineOp, effects: &mut Vec<Effect>) {
        effects.push(Effect::Engine {
            generation: self.generation,
            op,
        });
    }

    fn push_media(&self, op: MediaOp, effects: &mut Vec<Effect>) {
        effects.push(Effect::Media {
            generation: self.generation,
            op,
        });
    }
}
