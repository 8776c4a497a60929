//! Background task owning the relay WebSocket.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::types::{RelayCommand, RelayEvent, RelayState};
use crate::protocol::Envelope;

pub(crate) type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Pump commands out and frames in until either side closes.
///
/// Emits `RelayEvent::Closed` only when the transport drops on its own; a
/// local close ends the loop silently.
pub(crate) async fn connection_loop(
    ws_stream: RelayStream,
    state: Arc<RwLock<RelayState>>,
    event_tx: mpsc::Sender<RelayEvent>,
    mut command_rx: mpsc::Receiver<RelayCommand>,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(RelayCommand::Send(text)) => {
                    if let Err(e) = ws_write.send(WsMessage::Text(text.into())).await {
                        break format!("write failed: {e}");
                    }
                }
                Some(RelayCommand::Close) | None => {
                    let _ = ws_write.send(WsMessage::Close(None)).await;
                    let _ = ws_write.close().await;
                    return;
                }
            },
            frame = ws_read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match Envelope::decode(text.as_str()) {
                    Ok(envelope) => {
                        if *state.read().await == RelayState::Closed {
                            return;
                        }
                        debug!(kind = %envelope.message_type(), from = %envelope.name, "Relay recv");
                        if event_tx.send(RelayEvent::Envelope(envelope)).await.is_err() {
                            debug!("Relay event receiver dropped");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Dropping undecodable relay message");
                    }
                },
                Some(Ok(WsMessage::Binary(data))) => {
                    warn!(len = data.len(), "Dropping binary relay frame");
                }
                Some(Ok(WsMessage::Ping(_))) => {
                    // tungstenite queues the pong; push it out.
                    let _ = ws_write.flush().await;
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by relay".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
                None => break "connection ended".to_string(),
            },
        }
    };

    {
        let mut state = state.write().await;
        if *state == RelayState::Closed {
            return;
        }
        *state = RelayState::Closed;
    }

    info!(reason = %reason, "Relay connection dropped");
    let _ = event_tx.send(RelayEvent::Closed { reason }).await;
}
