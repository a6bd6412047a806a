//! Ephemera - TTL session store
//!
//! Main entry point for the Ephemera CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

use ephemera_config::{LoggingConfig, StrategyKind};

mod commands;

use commands::{config, demo, stress};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Ephemera - concurrent session store with autonomous expiry
#[derive(Parser)]
#[command(name = "ephemera")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ~/.config/ephemera/ephemera.toml)
    #[arg(long, global = true, env = "EPHEMERA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the expiry strategy: sweep or timer
    #[arg(long, global = true)]
    pub strategy: Option<StrategyKind>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, update and read back a session
    Demo(demo::DemoArgs),

    /// Hammer a store from many concurrent workers
    Stress(stress::StressArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Install console logging and, if configured, a rotating JSON file log.
///
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    let level = if verbose { "debug" } else { logging.level.as_str() };
    let console_filter = tracing_subscriber::EnvFilter::try_new(format!(
        "ephemera={level},ephemera_session={level},ephemera_config={level},warn"
    ))
    .with_context(|| format!("invalid log level '{}'", level))?;

    let (file_layer, guard) = match &logging.json_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "ephemera.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "ephemera=trace,ephemera_session=trace,ephemera_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = ephemera_config::load_config(cli.config.as_deref())?;
    let mut config = loaded.config;
    if let Some(strategy) = cli.strategy {
        config.session.strategy = strategy;
    }

    let _guard = init_tracing(&config.logging, cli.verbose)?;

    let ctx = commands::Context {
        config,
        config_source: loaded.source,
        json_output: cli.json,
    };

    match cli.command {
        Commands::Demo(args) => demo::run(args, &ctx).await,
        Commands::Stress(args) => stress::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
