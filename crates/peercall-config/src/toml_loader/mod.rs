//! Reading `config.toml` and writing the commented starter file.

mod loader;
mod paths;
mod template;

#[cfg(test)]
mod tests;

pub use loader::{load_default, load_from_path, parse};
pub use paths::{create_default_config, default_config_path};
