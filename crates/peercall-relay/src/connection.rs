//! Per-connection handler: register, then route envelopes by identity.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use peercall_signaling::protocol::{MessageType, WireEnvelope, USER_NOT_ONLINE, USER_READY};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::registry::Registry;

type WsStream = WebSocketStream<TcpStream>;

/// Handle a single WebSocket connection.
pub async fn handle_connection(
    ws: WsStream,
    addr: SocketAddr,
    registry: Registry,
    register_timeout: Duration,
) {
    let (mut sink, mut stream) = ws.split();

    // 1. The first frame must be store_user.
    let name = match read_registration(&mut stream, addr, register_timeout).await {
        Some(name) => name,
        None => return,
    };

    // 2. Claim the name.
    let (tx, mut rx) = mpsc::channel::<String>(256);
    if let Err(e) = registry.register(&name, tx.clone()).await {
        tracing::warn!(peer = %addr, name = %name, error = e, "Registration refused");
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: e.into(),
            })))
            .await;
        return;
    }

    tracing::info!(peer = %addr, name = %name, "Client registered");

    // 3. Forwarding loop.
    loop {
        tokio::select! {
            // Envelopes routed to us → this client's WebSocket
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // This client's WebSocket → router
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = route(&registry, &name, text.as_str()).await {
                            if sink.send(Message::Text(reply.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!(name = %name, "Dropping binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 4. Cleanup.
    registry.unregister(&name, &tx).await;
    tracing::info!(peer = %addr, name = %name, "Client disconnected");
}

/// Route one inbound envelope from `sender`.
///
/// Forwarded envelopes are renamed to their delivery form and stamped with
/// the sender's registered name; `data` is passed through untouched.
/// Returns a reply for the sender itself, if any.
pub(crate) async fn route(registry: &Registry, sender: &str, text: &str) -> Option<String> {
    let wire = match WireEnvelope::decode(text) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::warn!(from = %sender, error = %e, "Dropping malformed envelope");
            return None;
        }
    };

    let delivered_as = match wire.kind {
        MessageType::StartCall => return call_response(registry, sender, wire.target).await,
        MessageType::CreateOffer => MessageType::OfferReceived,
        MessageType::CreateAnswer => MessageType::AnswerReceived,
        MessageType::IceCandidate => MessageType::IceCandidate,
        MessageType::StoreUser => {
            tracing::debug!(from = %sender, "Ignoring repeated store_user");
            return None;
        }
        other => {
            tracing::warn!(from = %sender, kind = %other, "Dropping relay-originated type sent by a client");
            return None;
        }
    };

    let Some(target) = wire.target.filter(|t| !t.is_empty()) else {
        tracing::warn!(from = %sender, kind = %wire.kind, "Dropping envelope without target");
        return None;
    };

    let Some(peer_tx) = registry.sender(&target).await else {
        tracing::debug!(from = %sender, target = %target, kind = %wire.kind, "Target offline, dropping");
        return None;
    };

    let forwarded = WireEnvelope {
        kind: delivered_as,
        name: sender.to_string(),
        target: Some(target.clone()),
        data: wire.data,
    };
    match forwarded.encode() {
        Ok(json) => {
            tracing::debug!(from = %sender, target = %target, kind = %delivered_as, "Forwarding");
            if peer_tx.send(json).await.is_err() {
                tracing::debug!(target = %target, "Peer channel closed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to encode forwarded envelope"),
    }
    None
}

/// Answer a `start_call` with the callee's availability.
async fn call_response(registry: &Registry, sender: &str, target: Option<String>) -> Option<String> {
    let target = target.unwrap_or_default();
    let online = !target.is_empty() && target != sender && registry.is_online(&target).await;
    let status = if online { USER_READY } else { USER_NOT_ONLINE };
    tracing::debug!(from = %sender, target = %target, status, "Call request");

    let reply = WireEnvelope {
        kind: MessageType::CallResponse,
        name: target,
        target: Some(sender.to_string()),
        data: Some(Value::String(status.to_string())),
    };
    reply.encode().ok()
}

/// Read and validate the registration frame.
async fn read_registration(
    stream: &mut futures_util::stream::SplitStream<WsStream>,
    addr: SocketAddr,
    timeout: Duration,
) -> Option<String> {
    let frame = tokio::time::timeout(timeout, stream.next()).await;

    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match WireEnvelope::decode(text.as_str()) {
            Ok(wire) if wire.kind == MessageType::StoreUser && !wire.name.trim().is_empty() => {
                Some(wire.name)
            }
            Ok(wire) => {
                tracing::warn!(peer = %addr, kind = %wire.kind, "Expected store_user with a name");
                None
            }
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Invalid registration message");
                None
            }
        },
        Ok(Some(Ok(_))) => {
            tracing::warn!(peer = %addr, "Expected text registration, got another frame");
            None
        }
        Ok(Some(Err(e))) => {
            tracing::warn!(peer = %addr, error = %e, "WS error during registration");
            None
        }
        Ok(None) => {
            tracing::debug!(peer = %addr, "Connection closed before registration");
            None
        }
        Err(_) => {
            tracing::warn!(peer = %addr, "Registration timeout ({}s)", timeout.as_secs());
            None
        }
    }
}
