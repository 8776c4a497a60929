//! Tests for the full validation pipeline.

use super::*;
use crate::schema::*;

#[test]
fn default_config_validates() {
    let config = PeercallConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_non_websocket_relay_url() {
    let mut config = PeercallConfig::default();
    config.relay.url = "http://relay.example.com".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.url"));
}

#[test]
fn accepts_secure_relay_url() {
    let mut config = PeercallConfig::default();
    config.relay.url = "wss://relay.example.com/ws".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_zero_connect_timeout() {
    let mut config = PeercallConfig::default();
    config.relay.connect_timeout = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.connect_timeout"));
}

#[test]
fn zero_answer_timeout_is_allowed() {
    let mut config = PeercallConfig::default();
    config.call.answer_timeout = 0;
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_answer_timeout_too_large() {
    let mut config = PeercallConfig::default();
    config.call.answer_timeout = 601;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("call.answer_timeout"));
}

#[test]
fn catches_zero_candidate_queue() {
    let mut config = PeercallConfig::default();
    config.call.max_pending_candidates = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("call.max_pending_candidates"));
}

#[test]
fn catches_bad_stun_server() {
    let mut config = PeercallConfig::default();
    config.call.stun_servers = vec!["stun:ok.example.com:3478".into(), "udp://nope".into()];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("call.stun_servers[1]"));
    assert!(!err.contains("call.stun_servers[0]"));
}

#[test]
fn catches_identity_with_whitespace() {
    let mut config = PeercallConfig::default();
    config.identity.name = "alice smith".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("identity.name"));
}

#[test]
fn catches_identity_too_long() {
    let mut config = PeercallConfig::default();
    config.identity.name = "a".repeat(65);
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("identity.name"));
}

#[test]
fn catches_zero_port() {
    let mut config = PeercallConfig::default();
    config.server.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = PeercallConfig::default();
    config.server.port = 0;
    config.server.register_timeout = 0;
    config.relay.url = "tcp://x".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
    assert!(err.contains("server.register_timeout"));
    assert!(err.contains("relay.url"));
}
