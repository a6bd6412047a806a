//! Periodic sweep expiry.
//!
//! One task per store wakes every interval and, under the write lock,
//! bumps each session's missed-sweep counter. Sessions reaching the
//! threshold are removed in the same pass.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::id::IdGenerator;
use crate::record::{ExpiryState, deadline_after};
use crate::store::{Inner, Shared};

/// Spawn the sweep task for a store.
pub(crate) fn spawn<G: IdGenerator>(shared: &Arc<Shared<G>>, interval: Duration, max_missed: u32) {
    let weak = Arc::downgrade(shared);
    let shutdown = shared.shutdown.clone();
    // First tick one full interval after the store starts, not immediately
    let first_tick = deadline_after(interval);
    shared
        .tasks
        .spawn(run(weak, first_tick, interval, max_missed, shutdown));
}

async fn run<G: IdGenerator>(
    shared: Weak<Shared<G>>,
    first_tick: Instant,
    interval: Duration,
    max_missed: u32,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let mut inner = shared.inner.write().await;
        sweep(&mut inner, max_missed);
    }

    debug!("Sweep task stopped");
}

/// Run one sweep over all sessions. Returns the number removed.
pub(crate) fn sweep(inner: &mut Inner, max_missed: u32) -> usize {
    let before = inner.sessions.len();

    inner.sessions.retain(|session_id, record| match &mut record.expiry {
        ExpiryState::Sweep { missed } => {
            *missed += 1;
            if *missed >= max_missed {
                debug!(session_id = %session_id, missed = *missed, "Session expired");
                false
            } else {
                true
            }
        }
        ExpiryState::Timer { .. } => true,
    });

    let removed = before - inner.sessions.len();
    inner.expired += removed as u64;

    if removed > 0 {
        debug!(removed, live = inner.sessions.len(), "Sweep removed expired sessions");
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SessionRecord;

    fn inner_with(missed: &[u32]) -> Inner {
        let mut inner = Inner::default();
        for (i, m) in missed.iter().enumerate() {
            inner.sessions.insert(
                format!("session-{}", i),
                SessionRecord::new(ExpiryState::Sweep { missed: *m }),
            );
        }
        inner
    }

    #[test]
    fn test_sweep_increments_counters() {
        let mut inner = inner_with(&[0, 1]);

        assert_eq!(sweep(&mut inner, 5), 0);

        let counters: Vec<u32> = ["session-0", "session-1"]
            .iter()
            .map(|id| match inner.sessions[*id].expiry {
                ExpiryState::Sweep { missed } => missed,
                ExpiryState::Timer { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(counters, vec![1, 2]);
    }

    #[test]
    fn test_sweep_removes_at_threshold() {
        let mut inner = inner_with(&[4, 3, 0]);

        assert_eq!(sweep(&mut inner, 5), 1);
        assert!(!inner.sessions.contains_key("session-0"));
        assert!(inner.sessions.contains_key("session-1"));
        assert_eq!(inner.expired, 1);

        assert_eq!(sweep(&mut inner, 5), 1);
        assert!(!inner.sessions.contains_key("session-1"));
        assert_eq!(inner.expired, 2);
    }

    #[test]
    fn test_threshold_of_one_expires_on_first_sweep() {
        let mut inner = inner_with(&[0, 0, 0]);
        assert_eq!(sweep(&mut inner, 1), 3);
        assert!(inner.sessions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_store_stops_sweep() {
        let config = crate::StoreConfig::sweep(Duration::from_secs(1), 5);
        let store = crate::SessionStore::new(config);
        let tracker = store.shared_for_tests().tasks.clone();

        store.create_session().await.unwrap();
        assert_eq!(tracker.len(), 1);

        drop(store);
        tracker.close();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .expect("sweep task outlived the store");
    }
}
