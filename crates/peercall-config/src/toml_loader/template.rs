//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Peercall Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[identity]
# name = ""                # announced to the relay; empty = pass --name

[relay]
# url = "ws://127.0.0.1:3000"
# connect_timeout = 15     # seconds, 1-120

[call]
# answer_timeout = 30      # seconds, 0 disables, max 600
# max_pending_candidates = 256   # 1-4096
# stun_servers = ["stun:stun.l.google.com:19302"]

[server]
# bind = "0.0.0.0"
# port = 3000
# register_timeout = 10    # seconds, 1-120

[logging]
# level = "info"           # trace, debug, info, warn, error
"##
    .to_string()
}
