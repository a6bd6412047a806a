//! Config file discovery.
//!
//! Resolution order (first match wins):
//! 1. An explicit path (from `--config`)
//! 2. `$EPHEMERA_CONFIG_DIR/ephemera.toml`, or the platform config dir
//!    (`~/.config/ephemera/ephemera.toml` on Linux)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use crate::{ConfigError, EphemeraConfig, Result};

/// Config filename within the config directory.
const CONFIG_FILE: &str = "ephemera.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "ephemera";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "EPHEMERA_CONFIG_DIR";

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The loaded configuration.
    pub config: EphemeraConfig,
    /// File the configuration came from, or `None` for built-in defaults.
    pub source: Option<PathBuf>,
}

/// Load configuration.
///
/// An explicit path must exist and parse. The user config file is optional:
/// if it is missing, defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            config: load_config_file(path)?,
            source: Some(path.to_path_buf()),
        });
    }

    if let Some(path) = xdg_config_path()
        && path.is_file()
    {
        return Ok(LoadedConfig {
            config: load_config_file(&path)?,
            source: Some(path),
        });
    }

    Ok(LoadedConfig {
        config: EphemeraConfig::default(),
        source: None,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<EphemeraConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    EphemeraConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &EphemeraConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Get the user config file path.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(CONFIG_FILE))
}

/// Get the user config directory.
///
/// Checks `EPHEMERA_CONFIG_DIR` first, then falls back to the platform
/// default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrategyKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_xdg_config_path_shape() {
        // May be None in some CI environments
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with(CONFIG_FILE));
        }
    }

    #[test]
    fn test_explicit_path_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[session]\nstrategy = \"timer\"\nttl_ms = 100\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.session.strategy, StrategyKind::Timer);
        assert_eq!(loaded.config.session.ttl_ms, 100);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[session\n").unwrap();

        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = EphemeraConfig::new();
        config.session.max_missed_sweeps = 9;
        config.logging.level = "trace".to_string();
        save_config(&config, &path).unwrap();

        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
