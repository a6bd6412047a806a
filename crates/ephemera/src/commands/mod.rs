//! CLI command handlers.

pub mod config;
pub mod demo;
pub mod stress;

use std::path::PathBuf;

use ephemera_config::EphemeraConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved configuration (file plus CLI overrides).
    pub config: EphemeraConfig,
    /// File the configuration was loaded from, if any.
    pub config_source: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
}
