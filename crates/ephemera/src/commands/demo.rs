//! Demo command - walks one session through its whole lifecycle.

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use tracing::info;

use ephemera_session::{SessionData, SessionStore};

use super::Context;

/// Slack added to the configured lifetime before checking for expiry.
const EXPIRY_GRACE: Duration = Duration::from_millis(100);

/// Arguments for the demo command.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Value stored under the "website" key
    #[arg(long, default_value = "longhoang.de")]
    pub website: String,

    /// Wait past the session lifetime and show that it expired
    #[arg(short, long)]
    pub wait: bool,
}

/// Demo result for JSON output.
#[derive(Debug, Serialize)]
struct DemoOutput {
    session_id: String,
    strategy: String,
    data: SessionData,
    expired: Option<bool>,
}

/// Run the demo command.
pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    let store = SessionStore::new(ctx.config.session.store_config());

    let session_id = store.create_session().await?;
    info!(session_id = %session_id, "Created new session");

    let mut data = SessionData::new();
    data.insert("website".to_string(), serde_json::json!(args.website));
    store.update_session_data(&session_id, data).await?;
    info!(session_id = %session_id, website = %args.website, "Updated session data");

    let data = store.get_session_data(&session_id).await?;
    info!(session_id = %session_id, ?data, "Read session data");

    let expired = if args.wait {
        let wait = store.config().max_lifetime().saturating_add(EXPIRY_GRACE);
        info!(wait_ms = wait.as_millis() as u64, "Waiting for session to expire");
        tokio::time::sleep(wait).await;

        match store.get_session_data(&session_id).await {
            Err(e) if e.is_not_found() => Some(true),
            Err(e) => return Err(e.into()),
            Ok(_) => bail!("session {} outlived its configured lifetime", session_id),
        }
    } else {
        None
    };

    store.shutdown().await;

    if ctx.json_output {
        let output = DemoOutput {
            session_id,
            strategy: store.config().strategy.to_string(),
            data,
            expired,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Session Demo").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Strategy:"), store.config().strategy);
    println!("  {} {}", dim.apply_to("Session:"), session_id);
    println!(
        "  {} {}",
        dim.apply_to("Data:"),
        serde_json::to_string(&data)?
    );
    if expired == Some(true) {
        println!(
            "  {} {}",
            dim.apply_to("After wait:"),
            Style::new().yellow().apply_to("expired (session not found)")
        );
    }
    println!();

    Ok(())
}
