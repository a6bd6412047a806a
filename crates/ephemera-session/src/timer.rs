//! Per-session deadline timers.
//!
//! Each session gets one task that sleeps until the session's deadline.
//! Updates move the deadline through a watch channel, which wakes the task
//! to re-arm; no new task is spawned. When the deadline passes the task
//! takes the write lock, confirms the deadline it slept on is still the
//! current one, and removes the session.
//!
//! The task exits when:
//! - it removed its session,
//! - the session was removed some other way (the watch sender is dropped),
//! - the store shuts down or is dropped.

use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::id::IdGenerator;
use crate::store::Shared;

/// Spawn the timer task for one session.
pub(crate) fn spawn<G: IdGenerator>(
    shared: &Arc<Shared<G>>,
    session_id: String,
    deadline: watch::Receiver<Instant>,
) {
    let weak = Arc::downgrade(shared);
    let shutdown = shared.shutdown.clone();
    shared
        .tasks
        .spawn(run(weak, session_id, deadline, shutdown));
}

async fn run<G: IdGenerator>(
    shared: Weak<Shared<G>>,
    session_id: String,
    mut deadline: watch::Receiver<Instant>,
    shutdown: CancellationToken,
) {
    loop {
        let at = *deadline.borrow_and_update();

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            changed = deadline.changed() => {
                if changed.is_err() {
                    trace!(session_id = %session_id, "Session gone, timer stopped");
                    return;
                }
                continue;
            }
            _ = tokio::time::sleep_until(at) => {}
        }

        let Some(shared) = shared.upgrade() else {
            return;
        };
        let mut inner = shared.inner.write().await;

        match inner.sessions.get(&session_id).and_then(|r| r.deadline()) {
            Some(current) if current <= Instant::now() => {
                inner.sessions.remove(&session_id);
                inner.expired += 1;
                debug!(
                    session_id = %session_id,
                    live = inner.sessions.len(),
                    "Session expired"
                );
                return;
            }
            // Refreshed between waking and taking the lock
            Some(_) => continue,
            None => return,
        }
    }
}
