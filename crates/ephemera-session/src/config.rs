//! Configuration for the session store.

use std::fmt;
use std::time::Duration;

/// Default interval between sweeps for the sweep strategy.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of sweeps a session may miss before it is removed.
pub const DEFAULT_MAX_MISSED_SWEEPS: u32 = 5;

/// Default time-to-live for the timer strategy.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// Default number of random bytes in a session ID (before encoding).
pub const DEFAULT_ID_BYTES: usize = 32;

/// Smallest accepted ID length. Shorter IDs are too easy to guess.
pub const MIN_ID_BYTES: usize = 16;

/// Longest accepted sweep interval or TTL. Larger values are clamped to
/// this, which is as good as "never" for a session.
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// How sessions are expired.
///
/// A store runs exactly one strategy. The two are not numerically
/// equivalent: a sweep store expires after `max_missed` ticks without an
/// update, a timer store expires `ttl` after the last update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStrategy {
    /// One background task visits every session each `interval` and removes
    /// sessions that missed `max_missed` consecutive sweeps.
    Sweep { interval: Duration, max_missed: u32 },

    /// Each session owns a one-shot timer that fires `ttl` after its last
    /// update.
    Timer { ttl: Duration },
}

impl ExpiryStrategy {
    /// Short name used in logs and stats.
    pub fn name(&self) -> &'static str {
        match self {
            ExpiryStrategy::Sweep { .. } => "sweep",
            ExpiryStrategy::Timer { .. } => "timer",
        }
    }

    fn normalized(self) -> Self {
        match self {
            ExpiryStrategy::Sweep {
                interval,
                max_missed,
            } => ExpiryStrategy::Sweep {
                interval: interval.clamp(MIN_PERIOD, MAX_PERIOD),
                max_missed: max_missed.max(1),
            },
            ExpiryStrategy::Timer { ttl } => ExpiryStrategy::Timer {
                ttl: ttl.clamp(MIN_PERIOD, MAX_PERIOD),
            },
        }
    }
}

impl Default for ExpiryStrategy {
    fn default() -> Self {
        ExpiryStrategy::Sweep {
            interval: DEFAULT_SWEEP_INTERVAL,
            max_missed: DEFAULT_MAX_MISSED_SWEEPS,
        }
    }
}

impl fmt::Display for ExpiryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryStrategy::Sweep {
                interval,
                max_missed,
            } => write!(f, "sweep every {:?}, expire after {} missed", interval, max_missed),
            ExpiryStrategy::Timer { ttl } => write!(f, "timer, ttl {:?}", ttl),
        }
    }
}

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Expiration strategy and its parameters.
    pub strategy: ExpiryStrategy,

    /// Number of random bytes drawn for each session ID.
    pub id_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            strategy: ExpiryStrategy::default(),
            id_bytes: DEFAULT_ID_BYTES,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration using the periodic sweep strategy.
    pub fn sweep(interval: Duration, max_missed: u32) -> Self {
        Self::new().with_strategy(ExpiryStrategy::Sweep {
            interval,
            max_missed,
        })
    }

    /// Configuration using the per-session timer strategy.
    pub fn timer(ttl: Duration) -> Self {
        Self::new().with_strategy(ExpiryStrategy::Timer { ttl })
    }

    /// Set the expiration strategy.
    pub fn with_strategy(mut self, strategy: ExpiryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the number of random bytes per session ID.
    pub fn with_id_bytes(mut self, id_bytes: usize) -> Self {
        self.id_bytes = id_bytes;
        self
    }

    /// Longest time an idle session can stay reachable.
    ///
    /// For the sweep strategy this is `interval * max_missed`; the shortest
    /// is one interval less, depending on where in the tick the last update
    /// landed.
    pub fn max_lifetime(&self) -> Duration {
        match self.strategy.normalized() {
            ExpiryStrategy::Sweep {
                interval,
                max_missed,
            } => interval.saturating_mul(max_missed),
            ExpiryStrategy::Timer { ttl } => ttl,
        }
    }

    /// Clamp degenerate values so the store can always run.
    pub(crate) fn normalized(&self) -> Self {
        Self {
            strategy: self.strategy.normalized(),
            id_bytes: self.id_bytes.max(MIN_ID_BYTES),
        }
    }
}
