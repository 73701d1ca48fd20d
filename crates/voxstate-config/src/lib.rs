//! Configuration for the voxstate tools.
//!
//! Settings persist to disk as `config.ron`. Every section uses
//! `#[serde(default)]`, so older or partial files still load, and command-line
//! flags can override any loaded value.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CONFIG_FILE_NAME, Config, DebugConfig, RegistryConfig, StorageConfig};
pub use error::ConfigError;
