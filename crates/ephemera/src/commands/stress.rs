//! Stress command - many concurrent callers against one store.

use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use ephemera_session::{SessionData, SessionStore, StoreStats};

use super::Context;

/// Arguments for the stress command.
#[derive(Args, Debug)]
pub struct StressArgs {
    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 8)]
    pub workers: usize,

    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 5)]
    pub duration_secs: u64,

    /// Sessions each worker keeps refreshing before starting new ones
    #[arg(long, default_value_t = 16)]
    pub sessions_per_worker: usize,
}

/// Operation counts from one worker.
#[derive(Debug, Default, Clone, Serialize)]
struct WorkerReport {
    created: u64,
    updated: u64,
    reads: u64,
    not_found: u64,
}

impl WorkerReport {
    fn merge(&mut self, other: &WorkerReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.reads += other.reads;
        self.not_found += other.not_found;
    }
}

/// Stress result for JSON output.
#[derive(Debug, Serialize)]
struct StressOutput {
    strategy: String,
    workers: usize,
    duration_secs: u64,
    totals: WorkerReport,
    live_at_end: usize,
    expired: u64,
}

/// Run the stress command.
pub async fn run(args: StressArgs, ctx: &Context) -> Result<()> {
    let store = SessionStore::new(ctx.config.session.store_config());
    let deadline = Instant::now()
        .checked_add(Duration::from_secs(args.duration_secs))
        .context("--duration-secs is too large")?;

    info!(
        workers = args.workers,
        duration_secs = args.duration_secs,
        strategy = %store.config().strategy,
        "Starting stress run"
    );

    let mut handles = Vec::with_capacity(args.workers);
    for worker in 0..args.workers {
        let store = store.clone();
        let pool = args.sessions_per_worker.max(1);
        handles.push(tokio::spawn(async move {
            run_worker(store, worker, pool, deadline).await
        }));
    }

    let mut totals = WorkerReport::default();
    for (worker, handle) in handles.into_iter().enumerate() {
        let report = handle
            .await
            .with_context(|| format!("worker {} panicked", worker))??;
        debug!(worker, ?report, "Worker finished");
        totals.merge(&report);
    }

    let stats = store.stats().await;
    store.shutdown().await;

    print_report(&args, ctx, &store, totals, &stats)
}

/// One worker: keep a small pool of sessions, refresh them in turn, and
/// replace any that expired.
async fn run_worker(
    store: SessionStore,
    worker: usize,
    pool: usize,
    deadline: Instant,
) -> ephemera_session::Result<WorkerReport> {
    let mut report = WorkerReport::default();
    let mut sessions: Vec<String> = Vec::with_capacity(pool);
    let mut round: u64 = 0;

    while Instant::now() < deadline {
        round += 1;

        if sessions.len() < pool {
            sessions.push(store.create_session().await?);
            report.created += 1;
        }

        let slot = (round as usize) % sessions.len();
        let mut data = SessionData::new();
        data.insert("worker".to_string(), serde_json::json!(worker));
        data.insert("round".to_string(), serde_json::json!(round));

        match store.update_session_data(&sessions[slot], data.clone()).await {
            Ok(()) => report.updated += 1,
            Err(e) if e.is_not_found() => {
                report.not_found += 1;
                sessions.swap_remove(slot);
                continue;
            }
            Err(e) => return Err(e),
        }

        match store.get_session_data(&sessions[slot]).await {
            Ok(read) => {
                report.reads += 1;
                // Another worker never holds this ID, so the read sees our write
                debug_assert_eq!(read, data);
            }
            Err(e) if e.is_not_found() => {
                report.not_found += 1;
                sessions.swap_remove(slot);
            }
            Err(e) => return Err(e),
        }

        if round % 64 == 0 {
            tokio::task::yield_now().await;
        }
    }

    Ok(report)
}

fn print_report(
    args: &StressArgs,
    ctx: &Context,
    store: &SessionStore,
    totals: WorkerReport,
    stats: &StoreStats,
) -> Result<()> {
    if ctx.json_output {
        let output = StressOutput {
            strategy: store.config().strategy.to_string(),
            workers: args.workers,
            duration_secs: args.duration_secs,
            totals,
            live_at_end: stats.live,
            expired: stats.expired,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let ops = totals.created + totals.updated + totals.reads;
    let rate = ops as f64 / args.duration_secs.max(1) as f64;

    println!();
    println!("{}", style("Stress Run").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Strategy:"), store.config().strategy);
    println!("  {} {}", dim.apply_to("Workers:"), args.workers);
    println!("  {} {}", dim.apply_to("Created:"), totals.created);
    println!("  {} {}", dim.apply_to("Updated:"), totals.updated);
    println!("  {} {}", dim.apply_to("Reads:"), totals.reads);
    println!("  {} {}", dim.apply_to("Not found:"), totals.not_found);
    println!("  {} {:.0} ops/s", dim.apply_to("Throughput:"), rate);
    println!("  {} {}", dim.apply_to("Expired:"), stats.expired);
    println!("  {} {}", dim.apply_to("Live at end:"), stats.live);
    println!();

    Ok(())
}
