//! Property tests for refresh timing.
//!
//! Each case runs on a paused Tokio clock so timings are exact.

use std::time::Duration;

use ephemera_session::{SessionData, SessionStore, StoreConfig};
use proptest::prelude::*;
use serde_json::json;
use tokio::time::sleep;

const SWEEP_INTERVAL_MS: u64 = 100;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn data(round: usize) -> SessionData {
    let mut data = SessionData::new();
    data.insert("round".to_string(), json!(round));
    data
}

/// Outcome of a refresh schedule: whether every refresh found the session,
/// and liveness just before and just after the final deadline.
struct Outcome {
    refreshes_ok: bool,
    alive_before: bool,
    alive_after: bool,
    last_read: Option<SessionData>,
}

fn run_timer_schedule(ttl_ms: u64, gaps_ms: &[u64]) -> Outcome {
    paused_runtime().block_on(async {
        let store = SessionStore::new(StoreConfig::timer(Duration::from_millis(ttl_ms)));
        let id = store.create_session().await.unwrap();

        let mut refreshes_ok = true;
        for (round, gap) in gaps_ms.iter().enumerate() {
            sleep(Duration::from_millis(*gap)).await;
            refreshes_ok &= store.update_session_data(&id, data(round)).await.is_ok();
        }

        sleep(Duration::from_millis(ttl_ms - 5)).await;
        let last_read = store.get_session_data(&id).await.ok();
        let alive_before = last_read.is_some();

        sleep(Duration::from_millis(10)).await;
        let alive_after = store.contains(&id).await;

        store.shutdown().await;
        Outcome {
            refreshes_ok,
            alive_before,
            alive_after,
            last_read,
        }
    })
}

fn run_sweep_schedule(max_missed: u32, gaps_ms: &[u64]) -> Outcome {
    paused_runtime().block_on(async {
        let interval = Duration::from_millis(SWEEP_INTERVAL_MS);
        let store = SessionStore::new(StoreConfig::sweep(interval, max_missed));
        let id = store.create_session().await.unwrap();

        let mut refreshes_ok = true;
        for (round, gap) in gaps_ms.iter().enumerate() {
            sleep(Duration::from_millis(*gap)).await;
            refreshes_ok &= store.update_session_data(&id, data(round)).await.is_ok();
        }

        // The last refresh landed between ticks, so the session survives
        // max_missed - 1 full intervals and is gone after max_missed.
        let span = SWEEP_INTERVAL_MS * (max_missed as u64 - 1);
        sleep(Duration::from_millis(span)).await;
        let last_read = store.get_session_data(&id).await.ok();
        let alive_before = last_read.is_some();

        sleep(Duration::from_millis(SWEEP_INTERVAL_MS + 1)).await;
        let alive_after = store.contains(&id).await;

        store.shutdown().await;
        Outcome {
            refreshes_ok,
            alive_before,
            alive_after,
            last_read,
        }
    })
}

/// Turn fractional gaps into millisecond gaps that keep every refresh
/// strictly inside the survival window and off sweep tick boundaries.
fn sweep_gaps(max_missed: u32, fractions: &[u64]) -> Vec<u64> {
    let window = SWEEP_INTERVAL_MS * (max_missed as u64 - 1);
    let mut elapsed = 0;
    fractions
        .iter()
        .map(|f| {
            let mut gap = 1 + f * (window - 3) / 1000;
            if (elapsed + gap) % SWEEP_INTERVAL_MS == 0 {
                gap += 1;
            }
            elapsed += gap;
            gap
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: refreshing before the deadline always keeps the session,
    /// and the deadline is measured from the last refresh.
    #[test]
    fn timer_refresh_resets_deadline(
        ttl_ms in 50u64..2_000,
        fractions in prop::collection::vec(1u64..1000, 0..8),
    ) {
        let gaps: Vec<u64> = fractions.iter().map(|f| 1 + f * (ttl_ms - 2) / 1000).collect();
        let outcome = run_timer_schedule(ttl_ms, &gaps);

        prop_assert!(outcome.refreshes_ok);
        prop_assert!(outcome.alive_before);
        prop_assert!(!outcome.alive_after);
        if let Some(last) = gaps.len().checked_sub(1) {
            prop_assert_eq!(outcome.last_read, Some(data(last)));
        } else {
            prop_assert_eq!(outcome.last_read, Some(SessionData::new()));
        }
    }

    /// Property: with the sweep strategy a refresh resets the missed count,
    /// so the session lives max_missed - 1 to max_missed intervals past it.
    #[test]
    fn sweep_refresh_resets_missed_count(
        max_missed in 2u32..7,
        fractions in prop::collection::vec(1u64..1000, 0..8),
    ) {
        let gaps = sweep_gaps(max_missed, &fractions);
        let outcome = run_sweep_schedule(max_missed, &gaps);

        prop_assert!(outcome.refreshes_ok);
        prop_assert!(outcome.alive_before);
        prop_assert!(!outcome.alive_after);
    }

    /// Property: reads are idempotent and never extend the lifetime.
    #[test]
    fn reads_do_not_refresh(
        reads in prop::collection::vec(1u64..400, 1..10),
    ) {
        let ttl_ms = 500u64;
        let (snapshots, alive_after) = paused_runtime().block_on(async {
            let store = SessionStore::new(StoreConfig::timer(Duration::from_millis(ttl_ms)));
            let id = store.create_session().await.unwrap();
            store.update_session_data(&id, data(7)).await.unwrap();

            let mut snapshots = Vec::new();
            let mut elapsed = 0;
            for gap in reads {
                let gap = gap.min(ttl_ms - 10 - elapsed);
                elapsed += gap;
                sleep(Duration::from_millis(gap)).await;
                snapshots.push(store.get_session_data(&id).await.ok());
            }

            sleep(Duration::from_millis(ttl_ms - elapsed + 5)).await;
            let alive_after = store.contains(&id).await;
            store.shutdown().await;
            (snapshots, alive_after)
        });

        prop_assert!(snapshots.iter().all(|s| s.as_ref() == Some(&data(7))));
        prop_assert!(!alive_after);
    }
}
