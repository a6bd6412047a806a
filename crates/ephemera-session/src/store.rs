//! Concurrent session store with autonomous expiry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::config::{ExpiryStrategy, StoreConfig};
use crate::error::{Error, Result};
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::record::{ExpiryState, SessionData, SessionInfo, SessionRecord, deadline_after};
use crate::{sweep, timer};

/// Inner state protected by RwLock.
#[derive(Debug, Default)]
pub(crate) struct Inner {
    /// Live sessions by ID.
    pub(crate) sessions: HashMap<String, SessionRecord>,

    /// Sessions created over the store's lifetime.
    pub(crate) created: u64,

    /// Sessions removed by expiry over the store's lifetime.
    pub(crate) expired: u64,

    /// Set by shutdown; no sessions are created afterwards.
    pub(crate) closed: bool,
}

/// State shared by every store handle and its background tasks.
///
/// Background tasks only hold a `Weak` reference, so dropping the last
/// store handle drops this and fires the shutdown signal.
pub(crate) struct Shared<G> {
    pub(crate) inner: RwLock<Inner>,
    pub(crate) config: StoreConfig,
    pub(crate) shutdown: CancellationToken,
    pub(crate) tasks: TaskTracker,
    ids: G,
}

impl<G> Drop for Shared<G> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Session store with TTL-based expiry.
///
/// The store provides:
/// - Create/read/update of sessions keyed by opaque random IDs
/// - Autonomous expiry of sessions that are not updated in time
/// - Thread-safe access via RwLock: reads share, writes are exclusive
///
/// Reading a session never extends its lifetime; only
/// [`update_session_data`](Self::update_session_data) does. Sessions cannot
/// be deleted by callers; they leave the store by expiring or when the
/// store shuts down.
///
/// Cloning a store yields another handle onto the same sessions.
pub struct SessionStore<G: IdGenerator = RandomIdGenerator> {
    shared: Arc<Shared<G>>,
}

impl SessionStore<RandomIdGenerator> {
    /// Create a store that draws IDs from the operating system RNG.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime when the sweep strategy is
    /// configured, since the sweep task is spawned immediately.
    pub fn new(config: StoreConfig) -> Self {
        let ids = RandomIdGenerator::new(config.normalized().id_bytes);
        Self::with_id_generator(config, ids)
    }
}

impl<G: IdGenerator> SessionStore<G> {
    /// Create a store with a custom ID generator.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime when the sweep strategy is
    /// configured.
    pub fn with_id_generator(config: StoreConfig, ids: G) -> Self {
        let config = config.normalized();
        let shared = Arc::new(Shared {
            inner: RwLock::new(Inner::default()),
            config,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
            ids,
        });

        if let ExpiryStrategy::Sweep {
            interval,
            max_missed,
        } = shared.config.strategy
        {
            sweep::spawn(&shared, interval, max_missed);
        }

        debug!(strategy = %shared.config.strategy, "Session store started");

        Self { shared }
    }

    /// Get the store configuration (after clamping).
    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Create a new, empty session and return its ID.
    ///
    /// The expiry clock starts now. If the ID generator fails no session is
    /// created and the error is returned as-is.
    pub async fn create_session(&self) -> Result<String> {
        let session_id = self.shared.ids.generate()?;

        let mut inner = self.shared.inner.write().await;
        if inner.closed {
            return Err(Error::Closed);
        }

        let expiry = match self.shared.config.strategy {
            ExpiryStrategy::Sweep { .. } => ExpiryState::Sweep { missed: 0 },
            ExpiryStrategy::Timer { ttl } => {
                let (tx, rx) = watch::channel(deadline_after(ttl));
                timer::spawn(&self.shared, session_id.clone(), rx);
                ExpiryState::Timer { deadline: tx }
            }
        };

        inner
            .sessions
            .insert(session_id.clone(), SessionRecord::new(expiry));
        inner.created += 1;

        debug!(
            session_id = %session_id,
            live = inner.sessions.len(),
            "Session created"
        );

        Ok(session_id)
    }

    /// Get a copy of a session's data.
    ///
    /// Does not reset the expiry clock.
    pub async fn get_session_data(&self, session_id: &str) -> Result<SessionData> {
        let inner = self.shared.inner.read().await;
        match inner.sessions.get(session_id) {
            Some(record) => {
                trace!(session_id = %session_id, "Session data read");
                Ok(record.data.clone())
            }
            None => Err(Error::NotFound(session_id.to_string())),
        }
    }

    /// Replace a session's data and reset its expiry clock.
    ///
    /// The existence check and the replacement happen under one write lock,
    /// so an expiry that races this call either removes the session first
    /// (and this returns [`Error::NotFound`]) or sees the refreshed clock.
    pub async fn update_session_data(&self, session_id: &str, data: SessionData) -> Result<()> {
        let mut inner = self.shared.inner.write().await;
        let record = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(session_id.to_string()))?;

        record.replace(data, self.shared.config.max_lifetime());

        trace!(session_id = %session_id, keys = record.data.len(), "Session data replaced");
        Ok(())
    }

    /// Summary of a session without touching its expiry clock.
    pub async fn session_info(&self, session_id: &str) -> Result<SessionInfo> {
        let inner = self.shared.inner.read().await;
        inner
            .sessions
            .get(session_id)
            .map(|record| record.info(session_id))
            .ok_or_else(|| Error::NotFound(session_id.to_string()))
    }

    /// Check if a session is live.
    pub async fn contains(&self, session_id: &str) -> bool {
        self.shared.inner.read().await.sessions.contains_key(session_id)
    }

    /// Get the current number of live sessions.
    pub async fn len(&self) -> usize {
        self.shared.inner.read().await.sessions.len()
    }

    /// Check if the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.shared.inner.read().await.sessions.is_empty()
    }

    /// Run one sweep immediately and return how many sessions it removed.
    ///
    /// The background sweep keeps its own schedule. Stores using the timer
    /// strategy have nothing to sweep and return 0.
    pub async fn sweep_now(&self) -> usize {
        match self.shared.config.strategy {
            ExpiryStrategy::Sweep { max_missed, .. } => {
                let mut inner = self.shared.inner.write().await;
                sweep::sweep(&mut inner, max_missed)
            }
            ExpiryStrategy::Timer { .. } => 0,
        }
    }

    /// Get store statistics.
    pub async fn stats(&self) -> StoreStats {
        let inner = self.shared.inner.read().await;
        StoreStats {
            live: inner.sessions.len(),
            created: inner.created,
            expired: inner.expired,
            strategy: self.shared.config.strategy.name(),
            closed: inner.closed,
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub async fn is_closed(&self) -> bool {
        self.shared.inner.read().await.closed
    }

    /// Stop all background expiry tasks and drop every session.
    ///
    /// Waits until the sweep task and all timer tasks have exited. Returns
    /// the number of sessions dropped. Afterwards
    /// [`create_session`](Self::create_session) fails with [`Error::Closed`]
    /// and lookups fail with [`Error::NotFound`]. Calling it again is a no-op.
    pub async fn shutdown(&self) -> usize {
        self.shared.shutdown.cancel();

        let dropped = {
            let mut inner = self.shared.inner.write().await;
            inner.closed = true;
            let dropped = inner.sessions.len();
            inner.sessions.clear();
            dropped
        };

        self.shared.tasks.close();
        self.shared.tasks.wait().await;

        info!(dropped, "Session store shut down");
        dropped
    }

    #[cfg(test)]
    pub(crate) fn shared_for_tests(&self) -> &Shared<G> {
        &self.shared
    }
}

impl<G: IdGenerator> Clone for SessionStore<G> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Current number of live sessions.
    pub live: usize,

    /// Sessions created since the store started.
    pub created: u64,

    /// Sessions removed by expiry since the store started.
    pub expired: u64,

    /// Name of the expiry strategy.
    pub strategy: &'static str,

    /// Whether the store has been shut down.
    pub closed: bool,
}
