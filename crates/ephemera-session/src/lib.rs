//! Concurrent session store with TTL-based expiry.
//!
//! This crate provides an in-memory store mapping opaque session IDs to
//! application data, with:
//! - Random, URL-safe session IDs from a pluggable generator
//! - Whole-value replacement of session data on update
//! - Autonomous expiry of sessions that are not updated in time, by either
//!   a periodic sweep or a per-session timer
//! - Explicit shutdown that stops all background tasks
//!
//! Only updates refresh a session. Reads never extend its lifetime.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ephemera_session::{SessionData, SessionStore, StoreConfig};
//!
//! # async fn demo() -> ephemera_session::Result<()> {
//! let store = SessionStore::new(StoreConfig::timer(Duration::from_secs(5)));
//!
//! let id = store.create_session().await?;
//! let mut data = SessionData::new();
//! data.insert("website".into(), serde_json::json!("longhoang.de"));
//! store.update_session_data(&id, data).await?;
//!
//! let data = store.get_session_data(&id).await?;
//! assert_eq!(data["website"], "longhoang.de");
//!
//! store.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod id;
mod record;
mod store;
mod sweep;
mod timer;

pub use config::{
    DEFAULT_ID_BYTES, DEFAULT_MAX_MISSED_SWEEPS, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL,
    ExpiryStrategy, MAX_PERIOD, MIN_ID_BYTES, StoreConfig,
};
pub use error::{Error, Result};
pub use id::{IdError, IdGenerator, RandomIdGenerator};
pub use record::{SessionData, SessionInfo};
pub use store::{SessionStore, StoreStats};
