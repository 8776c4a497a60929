use serde::{Deserialize, Serialize};

/// Local identity announced to the relay with `store_user`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Name other clients use to call this one. Empty requires `--name`.
    pub name: String,
}
