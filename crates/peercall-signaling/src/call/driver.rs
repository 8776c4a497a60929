//! Async shell around [`CallController`].
//!
//! One task owns the controller and feeds it commands, relay events and
//! engine results one at a time. Engine operations run on a second task, in
//! the order they were issued, and come back as tagged completions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::controller::CallController;
use super::types::{
    CallCommand, CallConfig, CallEvent, CallInput, Completion, Effect, EngineOp, MediaOp, Phase,
};
use crate::engine::{LocalMedia, NegotiationEngine};
use crate::protocol::IceCandidate;
use crate::relay::{EnvelopeSink, RelayEvent};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A call controller that has not been started yet.
pub struct CallClient {
    controller: CallController,
    input_tx: mpsc::UnboundedSender<CallInput>,
    input_rx: mpsc::UnboundedReceiver<CallInput>,
    op_generation: Arc<AtomicU64>,
}

/// Lets a negotiation engine report what it observes on its own.
///
/// Reports are tagged with the generation of the call whose peer connection
/// produced them; reports from an earlier call are dropped by the controller.
#[derive(Clone)]
pub struct EngineObserver {
    input_tx: mpsc::UnboundedSender<CallInput>,
    op_generation: Arc<AtomicU64>,
}

impl EngineObserver {
    /// Generation of the engine operation currently running. An engine
    /// captures this when it builds a peer connection.
    pub fn generation(&self) -> u64 {
        self.op_generation.load(Ordering::SeqCst)
    }

    pub fn on_ice_candidate(&self, generation: u64, candidate: IceCandidate) {
        let _ = self.input_tx.send(CallInput::LocalCandidate {
            generation,
            candidate,
        });
    }

    pub fn on_connection_closed(&self, generation: u64) {
        let _ = self.input_tx.send(CallInput::ConnectionClosed { generation });
    }
}

impl CallClient {
    pub fn new(local_identity: impl Into<String>, config: CallConfig) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        Self {
            controller: CallController::new(local_identity, config),
            input_tx,
            input_rx,
            op_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Hand this to the engine before starting, so its callbacks land in the
    /// same queue as everything else.
    pub fn engine_observer(&self) -> EngineObserver {
        EngineObserver {
            input_tx: self.input_tx.clone(),
            op_generation: Arc::clone(&self.op_generation),
        }
    }

    /// Spawn the driver. Returns `(handle, event_receiver)`.
    pub fn start(
        self,
        sink: Arc<dyn EnvelopeSink>,
        relay_events: mpsc::Receiver<RelayEvent>,
        engine: Arc<dyn NegotiationEngine>,
        media: Box<dyn LocalMedia>,
    ) -> (CallHandle, mpsc::Receiver<CallEvent>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();

        tokio::spawn(engine_worker(
            engine,
            engine_rx,
            self.input_tx.clone(),
            self.op_generation,
        ));

        let driver = Driver {
            controller: self.controller,
            sink,
            media,
            engine_tx,
            input_tx: self.input_tx,
            event_tx,
            phase_tx,
        };
        tokio::spawn(driver.run(command_rx, relay_events, self.input_rx));

        let handle = CallHandle {
            command_tx,
            phase_rx,
        };
        (handle, event_rx)
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Commands for a running call driver. Cheap to clone; the driver hangs up
/// and stops once every handle is dropped.
#[derive(Clone)]
pub struct CallHandle {
    command_tx: mpsc::Sender<CallCommand>,
    phase_rx: watch::Receiver<Phase>,
}

impl CallHandle {
    pub async fn start_call(&self, target: &str) {
        self.send(CallCommand::StartCall(target.to_string())).await;
    }

    pub async fn accept_incoming_call(&self) {
        self.send(CallCommand::Accept).await;
    }

    pub async fn reject_incoming_call(&self) {
        self.send(CallCommand::Reject).await;
    }

    pub async fn hang_up(&self) {
        self.send(CallCommand::HangUp).await;
    }

    pub async fn set_muted(&self, muted: bool) {
        self.send(CallCommand::SetMuted(muted)).await;
    }

    pub async fn set_video_paused(&self, paused: bool) {
        self.send(CallCommand::SetVideoPaused(paused)).await;
    }

    pub async fn switch_camera(&self) {
        self.send(CallCommand::SwitchCamera).await;
    }

    /// Phase after the most recently processed input.
    pub fn phase(&self) -> Phase {
        *self.phase_rx.borrow()
    }

    /// Resolve once the published phase equals `phase`.
    pub async fn wait_for_phase(&self, phase: Phase) {
        let mut rx = self.phase_rx.clone();
        let _ = rx.wait_for(|current| *current == phase).await;
    }

    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }

    async fn send(&self, command: CallCommand) {
        if self.command_tx.send(command).await.is_err() {
            debug!("Call driver has stopped");
        }
    }
}

// ---------------------------------------------------------------------------
// Driver task
// ---------------------------------------------------------------------------

struct Driver {
    controller: CallController,
    sink: Arc<dyn EnvelopeSink>,
    media: Box<dyn LocalMedia>,
    engine_tx: mpsc::UnboundedSender<(u64, EngineOp)>,
    input_tx: mpsc::UnboundedSender<CallInput>,
    event_tx: mpsc::Sender<CallEvent>,
    phase_tx: watch::Sender<Phase>,
}

impl Driver {
    async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<CallCommand>,
        mut relay_events: mpsc::Receiver<RelayEvent>,
        mut input_rx: mpsc::UnboundedReceiver<CallInput>,
    ) {
        info!(identity = %self.controller.local_identity(), "Call driver started");
        let mut relay_open = true;

        loop {
            let input = tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => CallInput::Command(command),
                    None => break,
                },
                event = relay_events.recv(), if relay_open => match event {
                    Some(RelayEvent::Envelope(envelope)) => CallInput::Envelope(envelope),
                    Some(RelayEvent::Closed { reason }) => {
                        relay_open = false;
                        CallInput::RelayClosed { reason }
                    }
                    None => {
                        relay_open = false;
                        CallInput::RelayClosed {
                            reason: "relay event stream ended".to_string(),
                        }
                    }
                },
                Some(input) = input_rx.recv() => input,
            };

            self.step(input).await;
        }

        // Every handle is gone.
        self.step(CallInput::Command(CallCommand::HangUp)).await;
        self.sink.close().await;
        info!("Call driver stopped");
    }

    async fn step(&mut self, input: CallInput) {
        let effects = self.controller.handle(input);
        self.phase_tx.send_replace(self.controller.phase());

        for effect in effects {
            self.apply(effect).await;
        }
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Send(envelope) => {
                if let Err(e) = self.sink.send(&envelope).await {
                    warn!(kind = %envelope.message_type(), error = %e, "Failed to send envelope");
                }
            }
            Effect::Engine { generation, op } => {
                if self.engine_tx.send((generation, op)).is_err() {
                    error!("Engine worker has stopped");
                }
            }
            Effect::Media { generation, op } => self.apply_media(generation, op),
            Effect::Notify(event) => {
                if self.event_tx.send(event).await.is_err() {
                    debug!("Call event receiver dropped");
                }
            }
            Effect::ArmTimeout { generation, after } => {
                let input_tx = self.input_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = input_tx.send(CallInput::Timeout { generation });
                });
            }
            Effect::Enqueue(input) => {
                let _ = self.input_tx.send(input);
            }
        }
    }

    fn apply_media(&mut self, generation: u64, op: MediaOp) {
        match op {
            MediaOp::StartCapture => {
                if let Err(reason) = self.media.start_capture() {
                    warn!(error = %reason, "Local capture failed to start");
                    let _ = self
                        .input_tx
                        .send(CallInput::CaptureFailed { generation, reason });
                }
            }
            MediaOp::StopCapture => self.media.stop_capture(),
            MediaOp::SetAudioEnabled(enabled) => self.media.set_audio_enabled(enabled),
            MediaOp::SetVideoEnabled(enabled) => self.media.set_video_enabled(enabled),
            MediaOp::SwitchCamera => self.media.switch_camera(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine worker
// ---------------------------------------------------------------------------

/// Run engine operations strictly in issue order and post each result back
/// with the generation it was issued under.
async fn engine_worker(
    engine: Arc<dyn NegotiationEngine>,
    mut op_rx: mpsc::UnboundedReceiver<(u64, EngineOp)>,
    input_tx: mpsc::UnboundedSender<CallInput>,
    op_generation: Arc<AtomicU64>,
) {
    while let Some((generation, op)) = op_rx.recv().await {
        op_generation.store(generation, Ordering::SeqCst);
        let completion = match op {
            EngineOp::CreateOffer => Completion::OfferCreated(engine.create_offer().await.into()),
            EngineOp::CreateAnswer => {
                Completion::AnswerCreated(engine.create_answer().await.into())
            }
            EngineOp::SetLocalDescription(description) => Completion::LocalDescriptionSet(
                engine.set_local_description(description).await.into(),
            ),
            EngineOp::SetRemoteDescription(description) => Completion::RemoteDescriptionSet(
                engine.set_remote_description(description).await.into(),
            ),
            EngineOp::AddCandidate(candidate) => {
                Completion::CandidateAdded(engine.add_candidate(candidate).await.into())
            }
            EngineOp::Close => {
                engine.close().await;
                continue;
            }
        };

        if input_tx
            .send(CallInput::Completion {
                generation,
                completion,
            })
            .is_err()
        {
            break;
        }
    }
}
