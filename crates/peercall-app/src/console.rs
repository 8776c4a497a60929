//! Line-oriented console front end.

use std::time::Duration;

use peercall_signaling::{CallEvent, CallHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub const HELP: &str = "\
commands:
  call <name>   place a call
  accept        accept the incoming call
  reject        reject the incoming call
  hangup        end the current call
  mute/unmute   microphone
  pause/resume  camera
  switch        switch camera
  status        show the call phase
  config        show the loaded configuration
  quit          hang up and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Call(String),
    Accept,
    Reject,
    HangUp,
    Mute,
    Unmute,
    Pause,
    Resume,
    Switch,
    Status,
    Config,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "call" => match (words.next(), words.next()) {
            (Some(name), None) => ConsoleCommand::Call(name.to_string()),
            _ => return Err("usage: call <name>".to_string()),
        },
        "accept" | "a" => ConsoleCommand::Accept,
        "reject" | "r" => ConsoleCommand::Reject,
        "hangup" | "h" => ConsoleCommand::HangUp,
        "mute" => ConsoleCommand::Mute,
        "unmute" => ConsoleCommand::Unmute,
        "pause" => ConsoleCommand::Pause,
        "resume" => ConsoleCommand::Resume,
        "switch" => ConsoleCommand::Switch,
        "status" => ConsoleCommand::Status,
        "config" => ConsoleCommand::Config,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

/// One-line description of a call event for the console.
pub fn describe(event: &CallEvent) -> String {
    match event {
        CallEvent::CallFailed(error) => format!("call failed: {error}"),
        CallEvent::IncomingCall { from } => {
            format!("incoming call from {from} (accept / reject)")
        }
        CallEvent::CallConnected { peer } => format!("connected to {peer}"),
        CallEvent::CallEnded { peer } => format!("call with {peer} ended"),
        CallEvent::RelayDisconnected { reason } => format!("relay disconnected: {reason}"),
    }
}

/// Read commands from stdin and print call events until `quit` or EOF.
///
/// `settings` is the loaded configuration, rendered for the `config` command.
pub async fn run(handle: CallHandle, mut events: mpsc::Receiver<CallEvent>, settings: String) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                match parse_line(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(ConsoleCommand::Config)) => println!("{settings}"),
                    Ok(Some(command)) => dispatch(&handle, command).await,
                    Ok(None) => {}
                    Err(message) => println!("{message}"),
                }
            }
            event = events.recv() => match event {
                Some(event) => println!("{}", describe(&event)),
                None => break,
            },
        }
    }

    handle.hang_up().await;
    drop(handle);

    // The driver closes the relay and drops its event sender once the last
    // handle is gone.
    let drain = async {
        while let Some(event) = events.recv().await {
            println!("{}", describe(&event));
        }
    };
    if tokio::time::timeout(Duration::from_secs(2), drain).await.is_err() {
        tracing::debug!("Call driver did not stop in time");
    }
}

async fn dispatch(handle: &CallHandle, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Call(name) => handle.start_call(&name).await,
        ConsoleCommand::Accept => handle.accept_incoming_call().await,
        ConsoleCommand::Reject => handle.reject_incoming_call().await,
        ConsoleCommand::HangUp => handle.hang_up().await,
        ConsoleCommand::Mute => handle.set_muted(true).await,
        ConsoleCommand::Unmute => handle.set_muted(false).await,
        ConsoleCommand::Pause => handle.set_video_paused(true).await,
        ConsoleCommand::Resume => handle.set_video_paused(false).await,
        ConsoleCommand::Switch => handle.switch_camera().await,
        ConsoleCommand::Status => println!("phase: {}", handle.phase()),
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Config | ConsoleCommand::Quit => {}
    }
}

#[cfg(test)]
mod tests {
    use peercall_common::CallError;

    use super::*;

    #[test]
    fn parses_call_with_target() {
        assert_eq!(
            parse_line("call bob"),
            Ok(Some(ConsoleCommand::Call("bob".into())))
        );
        assert_eq!(
            parse_line("  CALL   bob  "),
            Ok(Some(ConsoleCommand::Call("bob".into())))
        );
    }

    #[test]
    fn call_requires_exactly_one_name() {
        assert!(parse_line("call").is_err());
        assert!(parse_line("call bob carol").is_err());
    }

    #[test]
    fn parses_short_forms() {
        assert_eq!(parse_line("a"), Ok(Some(ConsoleCommand::Accept)));
        assert_eq!(parse_line("h"), Ok(Some(ConsoleCommand::HangUp)));
        assert_eq!(parse_line("exit"), Ok(Some(ConsoleCommand::Quit)));
        assert_eq!(parse_line("Config"), Ok(Some(ConsoleCommand::Config)));
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = parse_line("dial bob").unwrap_err();
        assert!(err.contains("dial"));
    }

    #[test]
    fn describes_failures_with_reason() {
        let line = describe(&CallEvent::CallFailed(CallError::TargetUnavailable(
            "bob".into(),
        )));
        assert_eq!(line, "call failed: bob is not online");
    }
}
