//! Session records and their expiry state.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;

/// Application data held by a session.
///
/// Replaced wholesale on every update; never merged.
pub type SessionData = HashMap<String, serde_json::Value>;

/// Per-record expiry bookkeeping.
#[derive(Debug)]
pub(crate) enum ExpiryState {
    /// Number of sweeps since the last update.
    Sweep { missed: u32 },

    /// Deadline shared with the record's timer task. Dropping the sender
    /// tells the task its record is gone.
    Timer { deadline: watch::Sender<Instant> },
}

/// A live session as stored in the map.
#[derive(Debug)]
pub(crate) struct SessionRecord {
    pub(crate) data: SessionData,
    pub(crate) expiry: ExpiryState,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// New record with empty data.
    pub(crate) fn new(expiry: ExpiryState) -> Self {
        let now = Utc::now();
        Self {
            data: SessionData::new(),
            expiry,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the data and reset the expiry clock in one step.
    ///
    /// Timer records move their deadline to `ttl` from now; sweep records
    /// ignore `ttl`.
    pub(crate) fn replace(&mut self, data: SessionData, ttl: Duration) {
        self.data = data;
        self.updated_at = Utc::now();
        match &mut self.expiry {
            ExpiryState::Sweep { missed } => *missed = 0,
            ExpiryState::Timer { deadline } => {
                deadline.send_replace(deadline_after(ttl));
            }
        }
    }

    /// Current timer deadline, if this record is timer-driven.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        match &self.expiry {
            ExpiryState::Timer { deadline } => Some(*deadline.borrow()),
            ExpiryState::Sweep { .. } => None,
        }
    }

    pub(crate) fn info(&self, id: &str) -> SessionInfo {
        SessionInfo {
            id: id.to_string(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            keys: self.data.len(),
        }
    }
}

/// The instant `ttl` from now, saturating at the latest instant the clock
/// can represent.
pub(crate) fn deadline_after(ttl: Duration) -> Instant {
    let now = Instant::now();
    std::iter::successors(Some(ttl), |step| (!step.is_zero()).then(|| *step / 2))
        .find_map(|step| now.checked_add(step))
        .unwrap_or(now)
}

/// Read-only summary of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session ID.
    pub id: String,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// When the session data was last replaced.
    pub updated_at: DateTime<Utc>,

    /// Number of top-level keys in the session data.
    pub keys: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replace_resets_missed_counter() {
        let mut record = SessionRecord::new(ExpiryState::Sweep { missed: 3 });
        let mut data = SessionData::new();
        data.insert("website".into(), json!("longhoang.de"));

        record.replace(data.clone(), Duration::from_secs(5));

        assert!(matches!(record.expiry, ExpiryState::Sweep { missed: 0 }));
        assert_eq!(record.data, data);
        assert!(record.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_moves_timer_deadline() {
        let start = Instant::now();
        let (tx, rx) = watch::channel(start);
        let mut record = SessionRecord::new(ExpiryState::Timer { deadline: tx });

        let later = start + Duration::from_secs(5);
        record.replace(SessionData::new(), Duration::from_secs(5));

        assert_eq!(record.deadline(), Some(later));
        assert_eq!(*rx.borrow(), later);
    }

    #[test]
    fn test_replace_is_not_a_merge() {
        let mut record = SessionRecord::new(ExpiryState::Sweep { missed: 0 });
        let mut first = SessionData::new();
        first.insert("a".into(), json!(1));
        first.insert("b".into(), json!(2));
        record.replace(first, Duration::from_secs(5));

        let mut second = SessionData::new();
        second.insert("c".into(), json!(3));
        record.replace(second.clone(), Duration::from_secs(5));

        assert_eq!(record.data, second);
        assert_eq!(record.info("s").keys, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_after_saturates() {
        let now = Instant::now();
        assert_eq!(deadline_after(Duration::from_secs(1)), now + Duration::from_secs(1));
        assert!(deadline_after(Duration::MAX) > now + Duration::from_secs(86_400));
    }
}
