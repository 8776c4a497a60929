//! peercall: console client for relay-signaled peer-to-peer calls.
//!
//! Registers an identity with the relay, then places and answers calls from
//! stdin. Negotiation runs on webrtc-rs; local media is headless.

mod cli;
mod console;
mod engine;
mod media;

use std::sync::Arc;
use std::time::Duration;

use peercall_common::PeercallError;
use peercall_config::PeercallConfig;
use peercall_signaling::{CallClient, CallConfig, RelayConfig, RelaySession};
use tracing_subscriber::EnvFilter;

use crate::engine::RtcEngine;
use crate::media::HeadlessMedia;

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let loaded = peercall_config::load_config(args.config.as_deref());
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.as_directive())
        .unwrap_or("info");
    let directive = args.log_level.as_deref().unwrap_or(level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        PeercallConfig::default()
    });

    if let Err(e) = run(args, config).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: cli::Args, config: PeercallConfig) -> peercall_common::Result<()> {
    let identity = resolve_identity(args.name.as_deref(), &config.identity.name)?;
    let mut relay = RelaySession::new(RelayConfig {
        url: args.relay.unwrap_or_else(|| config.relay.url.clone()),
        connect_timeout: Duration::from_secs(u64::from(config.relay.connect_timeout)),
    });
    let relay_events = relay.connect(&identity).await?;

    let settings = peercall_config::config_to_json(&config);
    let client = CallClient::new(
        identity.clone(),
        CallConfig {
            answer_timeout: (config.call.answer_timeout > 0)
                .then(|| Duration::from_secs(u64::from(config.call.answer_timeout))),
            max_pending_candidates: config.call.max_pending_candidates as usize,
        },
    );

    let engine = RtcEngine::new(&config.call.stun_servers, client.engine_observer())
        .map_err(PeercallError::Other)?;

    let (handle, events) = client.start(
        Arc::new(relay),
        relay_events,
        Arc::new(engine),
        Box::new(HeadlessMedia::default()),
    );

    println!("signed in as {identity}");
    console::run(handle, events, settings).await;
    Ok(())
}

/// CLI name wins over the configured one. Identities are single words.
fn resolve_identity(cli: Option<&str>, configured: &str) -> Result<String, PeercallError> {
    let name = cli.unwrap_or(configured).trim();
    if name.is_empty() {
        return Err(PeercallError::Other(
            "no identity: pass --name or set [identity] name".into(),
        ));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(PeercallError::Other(format!(
            "identity must not contain whitespace: {name:?}"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_name_overrides_config() {
        assert_eq!(resolve_identity(Some("bob"), "alice").unwrap(), "bob");
        assert_eq!(resolve_identity(None, "alice").unwrap(), "alice");
    }

    #[test]
    fn empty_identity_is_rejected() {
        assert!(resolve_identity(None, "").is_err());
        assert!(resolve_identity(Some("  "), "alice").is_err());
    }

    #[test]
    fn whitespace_in_identity_is_rejected() {
        assert!(resolve_identity(Some("bob smith"), "").is_err());
    }
}
