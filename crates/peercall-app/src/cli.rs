use std::path::PathBuf;

use clap::Parser;

/// peercall: place and answer peer-to-peer calls through a signaling relay.
#[derive(Parser, Debug)]
#[command(name = "peercall", version, about)]
pub struct Args {
    /// Identity to register with the relay (overrides `[identity] name`).
    #[arg(short, long)]
    pub name: Option<String>,

    /// Relay WebSocket URL (overrides `[relay] url`).
    #[arg(short, long)]
    pub relay: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "peercall",
            "--name",
            "alice",
            "-r",
            "ws://relay.local:3000",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.name.as_deref(), Some("alice"));
        assert_eq!(args.relay.as_deref(), Some("ws://relay.local:3000"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.config.is_none());
    }

    #[test]
    fn everything_is_optional() {
        let args = Args::try_parse_from(["peercall"]).unwrap();
        assert!(args.name.is_none());
        assert!(args.relay.is_none());
    }
}
