//! # Configuration Module
//!
//! Engine tuning and data locations.
//!
//! ## Data Storage
//!
//! The listening store lives in the platform-standard data directory:
//! - Linux: `~/.local/share/attune/attune.db`
//! - macOS: `~/Library/Application Support/attune/attune.db`
//! - Windows: `%APPDATA%\attune\attune.db`
//!
//! ## Engine Configuration
//!
//! `config.json` in the platform config directory (`~/.config/attune/` on
//! Linux) may override any of the scoring weights, queue sizes, behavior
//! window or adaptation bounds. Missing fields keep their defaults, and a
//! missing file means all defaults.

use crate::adapt::AdaptationConfig;
use crate::algorithm::ScoringWeights;
use crate::behavior::BehaviorConfig;
use crate::queue::QueueConfig;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "attune";
const DB_FILE: &str = "attune.db";
const CONFIG_FILE: &str = "config.json";

/// Every tunable of the queue engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: ScoringWeights,
    pub queue: QueueConfig,
    pub behavior: BehaviorConfig,
    pub adaptation: AdaptationConfig,
}

impl EngineConfig {
    /// Load from `path`, or defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No engine config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the file written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

fn app_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    let base = base.ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system {kind} directory. Please ensure your platform supports standard {kind} directories."
        )
    })?;

    let dir = base.join(APP_DIR);
    fs::create_dir_all(&dir).with_context(|| {
        format!(
            "Failed to create Attune {kind} directory at {}. Please check file permissions.",
            dir.display()
        )
    })?;
    Ok(dir)
}

/// Platform data directory for Attune, created if missing.
///
/// # Errors
///
/// Fails if the platform has no data directory or it cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    app_dir(dirs::data_dir(), "data")
}

/// Default location of the SQLite listening store.
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Default location of the engine config file.
///
/// # Errors
///
/// Fails if the platform has no config directory or it cannot be created.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(app_dir(dirs::config_dir(), "config")?.join(CONFIG_FILE))
}

/// Resolved file locations for one run of the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl RuntimeConfig {
    /// Use explicit paths where given, platform defaults otherwise.
    ///
    /// # Errors
    ///
    /// Fails only when a default location is needed and cannot be created.
    pub fn resolve(db_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => get_db_path()?,
        };
        let config_path = match config_path {
            Some(path) => path,
            None => get_config_path()?,
        };
        Ok(Self { db_path, config_path })
    }

    /// # Errors
    ///
    /// See [`EngineConfig::load`].
    pub fn engine_config(&self) -> Result<EngineConfig> {
        EngineConfig::load(&self.config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = EngineConfig::load(&temp_dir.path().join("absent.json")).expect("defaults");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_defaults_keep_literal_weights() {
        let config = EngineConfig::default();
        assert_eq!(config.weights.tempo, 0.1);
        assert_eq!(config.weights.genre, 0.2);
        assert_eq!(config.weights.keyword_bonus, 0.2);
        assert_eq!(config.weights.context, 0.2);
        assert_eq!(config.queue.queue_size, 10);
        assert_eq!(config.queue.candidate_pool, 15);
        assert_eq!(config.behavior.window, 10);
        assert_eq!(config.adaptation.min_queue_len, 8);
    }

    #[test]
    fn test_partial_config_overrides_only_named_fields() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"queue": {"queue_size": 12}, "adaptation": {"similar": 0.7}}"#)
            .expect("Failed to write config");

        let config = EngineConfig::load(&path).expect("config should parse");
        assert_eq!(config.queue.queue_size, 12);
        assert_eq!(config.queue.candidate_pool, 15);
        assert_eq!(config.adaptation.similar, 0.7);
        assert_eq!(config.adaptation.near_duplicate, 0.8);
        assert_eq!(config.weights, ScoringWeights::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("config.json");
        let mut config = EngineConfig::default();
        config.behavior.min_events = 3;

        config.save(&path).expect("save");
        assert_eq!(EngineConfig::load(&path).expect("load"), config);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("Failed to write config");

        let err = EngineConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_runtime_config_with_explicit_paths() {
        let config = RuntimeConfig::resolve(
            Some(PathBuf::from("/tmp/test.db")),
            Some(PathBuf::from("/tmp/config.json")),
        )
        .expect("explicit paths need no platform dirs");
        assert_eq!(config.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.config_path, PathBuf::from("/tmp/config.json"));
    }
}
