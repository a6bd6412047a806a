//! Error types for session store operations.

use crate::id::IdError;

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The ID generator could not produce a session ID. No session was created.
    #[error("Session ID generation failed: {0}")]
    IdGeneration(#[from] IdError),

    /// Session was never issued, or has already expired.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The store has been shut down and no longer accepts new sessions.
    #[error("Session store is closed")]
    Closed,
}

impl Error {
    /// Whether this error means the session is gone (or never existed).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
