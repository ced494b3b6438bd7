//! Settings for the dogfight client: peer address, combat tuning and sync
//! tuning, stored as `config.ron` and overridable from the command line.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CombatConfig, Config, DebugConfig, NetworkConfig, SyncConfig, default_config_dir};
pub use error::ConfigError;
