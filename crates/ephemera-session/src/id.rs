//! Session ID generation.
//!
//! The store never invents IDs itself; it asks an [`IdGenerator`]. The
//! default [`RandomIdGenerator`] draws bytes from the operating system RNG
//! and encodes them as unpadded URL-safe base64, so IDs can travel in
//! cookies, headers and URLs unescaped.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::config::DEFAULT_ID_BYTES;

/// Failure to produce a session ID.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The entropy source could not be read.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// Any other generator-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Source of session IDs.
///
/// Implementations must return tokens with negligible collision probability
/// and must report failures instead of retrying or falling back to a weaker
/// source.
pub trait IdGenerator: Send + Sync + 'static {
    /// Produce a fresh session ID.
    fn generate(&self) -> Result<String, IdError>;
}

/// Generates IDs from the operating system RNG.
#[derive(Debug, Clone)]
pub struct RandomIdGenerator {
    bytes: usize,
}

impl RandomIdGenerator {
    /// Create a generator drawing `bytes` random bytes per ID.
    pub fn new(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Number of random bytes per ID.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_BYTES)
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<String, IdError> {
        let mut buf = vec![0u8; self.bytes];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| IdError::Entropy(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(buf))
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> Result<String, IdError> + Send + Sync + 'static,
{
    fn generate(&self) -> Result<String, IdError> {
        self()
    }
}
