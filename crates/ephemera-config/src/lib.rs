//! Configuration system for the Ephemera session store.
//!
//! Provides TOML-based configuration with:
//! - A `[session]` section choosing the expiry strategy and its timings
//! - A `[logging]` section for the CLI's tracing setup
//! - Discovery of an explicit file, then the XDG user config, then defaults

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
