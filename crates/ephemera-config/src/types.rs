//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [session]
//! strategy = "sweep"
//! sweep_interval_ms = 1000
//! max_missed_sweeps = 5
//! ttl_ms = 5000
//! id_bytes = 32
//!
//! [logging]
//! level = "info"
//! json_dir = "/var/log/ephemera"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use ephemera_session::{
    DEFAULT_ID_BYTES, DEFAULT_MAX_MISSED_SWEEPS, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL,
    ExpiryStrategy, MAX_PERIOD, MIN_ID_BYTES, StoreConfig,
};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional in the file; missing sections take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EphemeraConfig {
    /// Session store settings.
    pub session: SessionConfig,

    /// Logging settings for the CLI.
    pub logging: LoggingConfig,
}

impl EphemeraConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.session.validate()?;
        config.logging.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Which expiry strategy the store runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Periodic sweep with a missed-sweep threshold.
    #[default]
    Sweep,
    /// One deadline timer per session.
    Timer,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Sweep => write!(f, "sweep"),
            StrategyKind::Timer => write!(f, "timer"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sweep" => Ok(StrategyKind::Sweep),
            "timer" => Ok(StrategyKind::Timer),
            other => Err(ConfigError::InvalidValue {
                field: "session.strategy".to_string(),
                reason: format!("unknown strategy '{}', expected 'sweep' or 'timer'", other),
            }),
        }
    }
}

/// Session store configuration.
///
/// Only the fields of the selected strategy are used; the others are kept
/// so switching strategy is a one-line change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Expiry strategy.
    pub strategy: StrategyKind,
    /// Sweep strategy: milliseconds between sweeps.
    pub sweep_interval_ms: u64,
    /// Sweep strategy: sweeps a session may miss before it expires.
    pub max_missed_sweeps: u32,
    /// Timer strategy: milliseconds from last update to expiry.
    pub ttl_ms: u64,
    /// Random bytes per session ID.
    pub id_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
            max_missed_sweeps: DEFAULT_MAX_MISSED_SWEEPS,
            ttl_ms: DEFAULT_TTL.as_millis() as u64,
            id_bytes: DEFAULT_ID_BYTES,
        }
    }
}

impl SessionConfig {
    /// Reject values the store would otherwise have to clamp.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: format!("session.{}", field),
            reason: reason.to_string(),
        };

        let max_ms = MAX_PERIOD.as_millis() as u64;
        let too_long = format!("must be at most {} (one year)", max_ms);

        if self.sweep_interval_ms == 0 {
            return Err(invalid("sweep_interval_ms", "must be greater than zero"));
        }
        if self.sweep_interval_ms > max_ms {
            return Err(invalid("sweep_interval_ms", &too_long));
        }
        if self.max_missed_sweeps == 0 {
            return Err(invalid("max_missed_sweeps", "must be at least 1"));
        }
        if self.ttl_ms == 0 {
            return Err(invalid("ttl_ms", "must be greater than zero"));
        }
        if self.ttl_ms > max_ms {
            return Err(invalid("ttl_ms", &too_long));
        }
        if self.id_bytes < MIN_ID_BYTES {
            return Err(invalid(
                "id_bytes",
                &format!("must be at least {}", MIN_ID_BYTES),
            ));
        }
        Ok(())
    }

    /// Build the store configuration for the selected strategy.
    pub fn store_config(&self) -> StoreConfig {
        let strategy = match self.strategy {
            StrategyKind::Sweep => ExpiryStrategy::Sweep {
                interval: Duration::from_millis(self.sweep_interval_ms),
                max_missed: self.max_missed_sweeps,
            },
            StrategyKind::Timer => ExpiryStrategy::Timer {
                ttl: Duration::from_millis(self.ttl_ms),
            },
        };
        StoreConfig::new()
            .with_strategy(strategy)
            .with_id_bytes(self.id_bytes)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Directory for daily-rotated JSON logs. Disabled when unset.
    pub json_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Levels accepted for `level`, lowest verbosity first.
    pub const LEVELS: [&'static str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

    /// Reject unknown log levels.
    pub fn validate(&self) -> Result<()> {
        let known = Self::LEVELS
            .iter()
            .any(|level| level.eq_ignore_ascii_case(&self.level));
        if !known {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!(
                    "unknown level '{}', expected one of {}",
                    self.level,
                    Self::LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
