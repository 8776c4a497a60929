//! Per-section validators.

use crate::schema::PeercallConfig;

use super::helpers::{validate_range, validate_scheme};

const MAX_IDENTITY_LEN: usize = 64;

/// Identity names travel in every envelope; keep them printable and short.
pub(crate) fn validate_identity(errors: &mut Vec<String>, config: &PeercallConfig) {
    let name = &config.identity.name;
    if name.chars().count() > MAX_IDENTITY_LEN {
        errors.push(format!(
            "identity.name is longer than {MAX_IDENTITY_LEN} characters"
        ));
    }
    if name.chars().any(char::is_whitespace) {
        errors.push(format!("identity.name = {name:?} must not contain whitespace"));
    }
}

pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &PeercallConfig) {
    validate_scheme(errors, "relay.url", &config.relay.url, &["ws://", "wss://"]);
    validate_range(
        errors,
        "relay.connect_timeout",
        config.relay.connect_timeout,
        1,
        120,
    );
}

pub(crate) fn validate_call(errors: &mut Vec<String>, config: &PeercallConfig) {
    validate_range(
        errors,
        "call.answer_timeout",
        config.call.answer_timeout,
        0,
        600,
    );
    validate_range(
        errors,
        "call.max_pending_candidates",
        config.call.max_pending_candidates,
        1,
        4096,
    );
    for (i, server) in config.call.stun_servers.iter().enumerate() {
        validate_scheme(
            errors,
            &format!("call.stun_servers[{i}]"),
            server,
            &["stun:", "turn:", "turns:"],
        );
    }
}

pub(crate) fn validate_server(errors: &mut Vec<String>, config: &PeercallConfig) {
    validate_range(errors, "server.port", u32::from(config.server.port), 1, 65535);
    validate_range(
        errors,
        "server.register_timeout",
        config.server.register_timeout,
        1,
        120,
    );
    if config.server.bind.trim().is_empty() {
        errors.push("server.bind must not be empty".into());
    }
}
