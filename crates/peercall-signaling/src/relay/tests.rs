use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use super::*;
use crate::protocol::{Envelope, SessionDescription, Signal};

type ServerStream = WebSocketStream<TcpStream>;

/// Accept one WebSocket client on an ephemeral port and run `handler` on it.
async fn spawn_server<F, Fut>(handler: F) -> String
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        handler(ws).await;
    });
    format!("ws://{addr}")
}

fn config(url: String) -> RelayConfig {
    RelayConfig {
        url,
        connect_timeout: Duration::from_secs(5),
    }
}

async fn next_text(ws: &mut ServerStream) -> String {
    loop {
        match ws.next().await {
            Some(Ok(WsMessage::Text(text))) => return text.as_str().to_string(),
            Some(Ok(_)) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

async fn recv_event(rx: &mut mpsc::Receiver<RelayEvent>) -> Option<RelayEvent> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for relay event")
}

#[tokio::test]
async fn connect_registers_then_sends_in_order() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let url = spawn_server(move |mut ws| async move {
        for _ in 0..3 {
            let text = next_text(&mut ws).await;
            seen_tx.send(Envelope::decode(&text).unwrap()).unwrap();
        }
    })
    .await;

    let mut session = RelaySession::new(config(url));
    assert_eq!(session.state().await, RelayState::Disconnected);

    let _events = session.connect("alice").await.unwrap();
    assert_eq!(session.state().await, RelayState::Open);

    session.send(&Envelope::start_call("alice", "bob")).await.unwrap();
    session
        .send(&Envelope::create_offer(
            "alice",
            "bob",
            SessionDescription::offer("v=0"),
        ))
        .await
        .unwrap();

    assert_eq!(seen_rx.recv().await.unwrap(), Envelope::store_user("alice"));
    assert_eq!(seen_rx.recv().await.unwrap().signal, Signal::StartCall);
    assert_eq!(
        seen_rx.recv().await.unwrap().signal,
        Signal::CreateOffer(SessionDescription::offer("v=0"))
    );
}

#[tokio::test]
async fn inbound_envelopes_are_delivered_and_garbage_dropped() {
    let url = spawn_server(|mut ws| async move {
        let _store_user = next_text(&mut ws).await;
        ws.send(WsMessage::Text("{\"type\":\"nonsense\"}".into()))
            .await
            .unwrap();
        ws.send(WsMessage::Binary(vec![1u8, 2, 3].into())).await.unwrap();
        ws.send(WsMessage::Text(
            r#"{"type":"call_response","data":"user is not online"}"#.into(),
        ))
        .await
        .unwrap();
        // Keep the socket open until the client goes away.
        while ws.next().await.is_some() {}
    })
    .await;

    let mut session = RelaySession::new(config(url));
    let mut events = session.connect("alice").await.unwrap();

    let event = recv_event(&mut events).await.unwrap();
    assert_eq!(
        event,
        RelayEvent::Envelope(Envelope::new(
            "",
            None,
            Signal::CallResponse("user is not online".into())
        ))
    );
    assert_eq!(session.state().await, RelayState::Open);
}

#[tokio::test]
async fn unreachable_endpoint_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut session = RelaySession::new(config(format!("ws://{addr}")));
    let err = session.connect("alice").await.unwrap_err();
    assert!(matches!(err, RelayError::Connection(_)));
    assert_eq!(session.state().await, RelayState::Disconnected);
}

#[tokio::test]
async fn send_before_connect_is_send_error() {
    let session = RelaySession::new(RelayConfig::default());
    let err = session
        .send(&Envelope::start_call("alice", "bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Send(_)));
}

#[tokio::test]
async fn remote_close_emits_closed_once() {
    let url = spawn_server(|mut ws| async move {
        let _store_user = next_text(&mut ws).await;
        let _ = ws.close(None).await;
    })
    .await;

    let mut session = RelaySession::new(config(url));
    let mut events = session.connect("alice").await.unwrap();

    match recv_event(&mut events).await {
        Some(RelayEvent::Closed { .. }) => {}
        other => panic!("expected Closed, got {other:?}"),
    }
    assert_eq!(recv_event(&mut events).await, None);
    assert_eq!(session.state().await, RelayState::Closed);

    let err = session
        .send(&Envelope::start_call("alice", "bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Send(_)));
}

#[tokio::test]
async fn local_close_is_idempotent_and_silent() {
    let url = spawn_server(|mut ws| async move {
        let _store_user = next_text(&mut ws).await;
        // Whatever the client does next, keep talking until it hangs up.
        let _ = ws
            .send(WsMessage::Text(
                r#"{"type":"call_response","data":"user is ready for call"}"#.into(),
            ))
            .await;
        while ws.next().await.is_some() {}
    })
    .await;

    let mut session = RelaySession::new(config(url));
    let mut events = session.connect("alice").await.unwrap();

    session.close().await;
    session.close().await;
    assert_eq!(session.state().await, RelayState::Closed);

    // The loop may or may not have forwarded the response before close, but
    // it never reports Closed for a local close.
    while let Some(event) = recv_event(&mut events).await {
        assert!(!matches!(event, RelayEvent::Closed { .. }));
    }

    let err = session.connect("alice").await.unwrap_err();
    assert!(matches!(err, RelayError::Connection(_)));
}
