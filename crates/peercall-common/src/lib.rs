pub mod errors;

pub use errors::{CallError, ConfigError, PeercallError, RelayError};

pub type Result<T> = std::result::Result<T, PeercallError>;
