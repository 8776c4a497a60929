//! Public handle for the relay connection.

use std::sync::Arc;

use async_trait::async_trait;
use peercall_common::RelayError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

use super::connection::connection_loop;
use super::types::{RelayCommand, RelayConfig, RelayEvent, RelayState};
use super::EnvelopeSink;
use crate::protocol::Envelope;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Handle for one connection to the relay.
///
/// Writes are forwarded to a single background task, so envelopes reach the
/// relay in the order `send` was called. Inbound envelopes arrive on the
/// receiver returned by [`RelaySession::connect`].
pub struct RelaySession {
    config: RelayConfig,
    state: Arc<RwLock<RelayState>>,
    command_tx: Option<mpsc::Sender<RelayCommand>>,
}

impl RelaySession {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(RelayState::Disconnected)),
            command_tx: None,
        }
    }

    /// Open the transport and register `local_identity` with a `store_user`
    /// envelope.
    ///
    /// Failures are returned to the caller and never retried here; the
    /// session goes back to `Disconnected` so a new attempt can be made.
    pub async fn connect(
        &mut self,
        local_identity: &str,
    ) -> Result<mpsc::Receiver<RelayEvent>, RelayError> {
        {
            let mut state = self.state.write().await;
            if *state != RelayState::Disconnected {
                return Err(RelayError::Connection(format!(
                    "cannot connect from {:?} state",
                    *state
                )));
            }
            *state = RelayState::Connecting;
        }

        info!(url = %self.config.url, identity = %local_identity, "Connecting to relay");

        let ws_stream = match tokio::time::timeout(
            self.config.connect_timeout,
            tokio_tungstenite::connect_async(self.config.url.as_str()),
        )
        .await
        {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                error!(url = %self.config.url, error = %e, "Failed to connect to relay");
                *self.state.write().await = RelayState::Disconnected;
                return Err(RelayError::Connection(e.to_string()));
            }
            Err(_elapsed) => {
                let secs = self.config.connect_timeout.as_secs();
                error!(url = %self.config.url, "Relay connection timed out after {secs}s");
                *self.state.write().await = RelayState::Disconnected;
                return Err(RelayError::Connection(format!(
                    "connection timed out after {secs}s"
                )));
            }
        };

        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);

        *self.state.write().await = RelayState::Open;
        self.command_tx = Some(command_tx);

        tokio::spawn(connection_loop(
            ws_stream,
            Arc::clone(&self.state),
            event_tx,
            command_rx,
        ));

        self.send(&Envelope::store_user(local_identity)).await?;
        info!(identity = %local_identity, relay = %self.config.url, "Registered with relay");

        Ok(event_rx)
    }

    /// Serialize and transmit one envelope. Fire-and-forget: success means
    /// the envelope was queued for the writer, not that it was delivered.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), RelayError> {
        let state = *self.state.read().await;
        if state != RelayState::Open {
            return Err(RelayError::Send(format!("transport is {state:?}")));
        }

        let command_tx = self
            .command_tx
            .as_ref()
            .ok_or_else(|| RelayError::Send("transport is not connected".to_string()))?;

        let json = envelope.encode()?;
        debug!(kind = %envelope.message_type(), target = ?envelope.target, "Relay send");

        command_tx
            .send(RelayCommand::Send(json))
            .await
            .map_err(|_| RelayError::Send("connection task has stopped".to_string()))
    }

    /// Close the transport. Safe to call more than once; no events are
    /// delivered after the first call.
    pub async fn close(&self) {
        {
            let mut state = self.state.write().await;
            if *state == RelayState::Closed {
                return;
            }
            *state = RelayState::Closed;
        }

        if let Some(command_tx) = &self.command_tx {
            let _ = command_tx.send(RelayCommand::Close).await;
        }
        info!("Relay session closed");
    }

    pub async fn state(&self) -> RelayState {
        *self.state.read().await
    }
}

#[async_trait]
impl EnvelopeSink for RelaySession {
    async fn send(&self, envelope: &Envelope) -> Result<(), RelayError> {
        RelaySession::send(self, envelope).await
    }

    async fn close(&self) {
        RelaySession::close(self).await
    }
}
