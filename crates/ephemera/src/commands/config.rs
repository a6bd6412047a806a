//! Config command - configuration management.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;

use ephemera_config::{self, EphemeraConfig};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show the user config file path
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    source: Option<String>,
    max_lifetime_ms: u64,
    config: &'a EphemeraConfig,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
        ConfigCommand::Init { force } => init(force),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let source = ctx
        .config_source
        .as_ref()
        .map(|p| p.display().to_string());
    let max_lifetime = ctx.config.session.store_config().max_lifetime();

    if ctx.json_output {
        let output = ShowOutput {
            source,
            max_lifetime_ms: u64::try_from(max_lifetime.as_millis()).unwrap_or(u64::MAX),
            config: &ctx.config,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match source {
        Some(path) => println!("# loaded from {}", path),
        None => println!("# built-in defaults"),
    }
    println!("# idle sessions expire within {:?}", max_lifetime);
    print!("{}", ctx.config.to_toml()?);
    Ok(())
}

fn path(ctx: &Context) -> Result<()> {
    let Some(path) = ephemera_config::xdg_config_path() else {
        bail!("could not determine the user config directory");
    };

    if ctx.json_output {
        println!(
            "{}",
            serde_json::json!({ "path": path, "exists": path.is_file() })
        );
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn init(force: bool) -> Result<()> {
    let Some(path) = ephemera_config::xdg_config_path() else {
        bail!("could not determine the user config directory");
    };

    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    ephemera_config::save_config(&EphemeraConfig::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
