//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StatusError};
use crate::core::paths;

/// Full status-layer configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub rate: RateConfig,
    pub modal: ModalConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Sync-health trigger knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Auto-open the syncing dialog when the node trails the network by more
    /// than this many blocks.
    pub auto_open_gap_blocks: i64,
    /// Disarm auto-open after the user dismisses the syncing dialog, until the
    /// node reports a healthy gap again.
    pub suppress_after_dismiss: bool,
    /// Push the sync percentage to the mounted dialog after every sample.
    pub forward_progress: bool,
}

/// EWMA block-rate smoothing knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateConfig {
    pub base_alpha: f64,
    pub min_alpha: f64,
    pub max_alpha: f64,
    pub min_samples: u64,
}

/// Dialog slot policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModalConfig {
    /// Closability assigned to sessions whose request and registration do not override it.
    pub default_closable: bool,
    /// Global policy gate for user-initiated close.
    pub enable_close: bool,
    /// Whether the escape/cancel signal closes dialogs at all.
    pub close_on_escape: bool,
    /// Progress text shown once the chain is fully synced.
    pub completion_message: String,
}

/// Height-source polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    pub poll_interval_ms: u64,
}

/// JSONL activity log tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
    pub channel_capacity: usize,
}

/// Filesystem paths used by wss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
    pub jsonl_fallback: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_open_gap_blocks: 50,
            suppress_after_dismiss: true,
            forward_progress: true,
        }
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            base_alpha: 0.30,
            min_alpha: 0.10,
            max_alpha: 0.75,
            min_samples: 3,
        }
    }
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            default_closable: true,
            enable_close: true,
            close_on_escape: true,
            completion_message: "blockchain fully synced".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: 16 * 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 10,
            channel_capacity: 1024,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: paths::config_dir().join("config.toml"),
            jsonl_log: paths::data_dir().join("activity.jsonl"),
            jsonl_fallback: Some(env::temp_dir().join("wss-activity.jsonl")),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| StatusError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(StatusError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Render the effective config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StatusError::Serialization {
            context: "toml",
            details: e.to_string(),
        })
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // sync
        set_i64(&mut lookup, "WSS_SYNC_AUTO_OPEN_GAP_BLOCKS", &mut self.sync.auto_open_gap_blocks)?;
        set_bool(
            &mut lookup,
            "WSS_SYNC_SUPPRESS_AFTER_DISMISS",
            &mut self.sync.suppress_after_dismiss,
        )?;
        set_bool(&mut lookup, "WSS_SYNC_FORWARD_PROGRESS", &mut self.sync.forward_progress)?;

        // rate
        set_f64(&mut lookup, "WSS_RATE_BASE_ALPHA", &mut self.rate.base_alpha)?;
        set_f64(&mut lookup, "WSS_RATE_MIN_ALPHA", &mut self.rate.min_alpha)?;
        set_f64(&mut lookup, "WSS_RATE_MAX_ALPHA", &mut self.rate.max_alpha)?;
        set_u64(&mut lookup, "WSS_RATE_MIN_SAMPLES", &mut self.rate.min_samples)?;

        // modal
        set_bool(&mut lookup, "WSS_MODAL_DEFAULT_CLOSABLE", &mut self.modal.default_closable)?;
        set_bool(&mut lookup, "WSS_MODAL_ENABLE_CLOSE", &mut self.modal.enable_close)?;
        set_bool(&mut lookup, "WSS_MODAL_CLOSE_ON_ESCAPE", &mut self.modal.close_on_escape)?;
        if let Some(raw) = lookup("WSS_MODAL_COMPLETION_MESSAGE") {
            self.modal.completion_message = raw;
        }

        // ingest
        set_u64(&mut lookup, "WSS_INGEST_POLL_INTERVAL_MS", &mut self.ingest.poll_interval_ms)?;

        // logging
        set_bool(&mut lookup, "WSS_LOGGING_ENABLED", &mut self.logging.enabled)?;
        set_u64(&mut lookup, "WSS_LOGGING_MAX_SIZE_BYTES", &mut self.logging.max_size_bytes)?;

        // paths
        if let Some(raw) = lookup("WSS_PATHS_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    fn normalize_paths(&mut self) {
        self.paths.jsonl_log = paths::resolve_absolute_path(&self.paths.jsonl_log);
        if let Some(fallback) = self.paths.jsonl_fallback.as_mut() {
            *fallback = paths::resolve_absolute_path(fallback);
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.sync.auto_open_gap_blocks < 0 {
            return Err(StatusError::InvalidConfig {
                details: format!(
                    "sync.auto_open_gap_blocks must be >= 0, got {}",
                    self.sync.auto_open_gap_blocks
                ),
            });
        }

        if !(self.rate.min_alpha > 0.0
            && self.rate.min_alpha <= self.rate.base_alpha
            && self.rate.base_alpha <= self.rate.max_alpha
            && self.rate.max_alpha < 1.0)
        {
            return Err(StatusError::InvalidConfig {
                details: "EWMA alpha values must satisfy 0 < min <= base <= max < 1".to_string(),
            });
        }

        if self.rate.min_samples == 0 {
            return Err(StatusError::InvalidConfig {
                details: "rate.min_samples must be >= 1".to_string(),
            });
        }

        if self.modal.completion_message.trim().is_empty() {
            return Err(StatusError::InvalidConfig {
                details: "modal.completion_message must not be empty".to_string(),
            });
        }

        if self.ingest.poll_interval_ms == 0 {
            return Err(StatusError::InvalidConfig {
                details: "ingest.poll_interval_ms must be > 0".to_string(),
            });
        }

        if self.logging.max_size_bytes == 0
            || self.logging.max_rotated_files == 0
            || self.logging.channel_capacity == 0
        {
            return Err(StatusError::InvalidConfig {
                details:
                    "logging.max_size_bytes, max_rotated_files and channel_capacity must be > 0"
                        .to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| StatusError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn set_f64<F: FnMut(&str) -> Option<String>>(lookup: &mut F, name: &str, slot: &mut f64) -> Result<()> {
    if let Some(raw) = lookup(name) {
        *slot = parse_env(name, &raw)?;
    }
    Ok(())
}

fn set_u64<F: FnMut(&str) -> Option<String>>(lookup: &mut F, name: &str, slot: &mut u64) -> Result<()> {
    if let Some(raw) = lookup(name) {
        *slot = parse_env(name, &raw)?;
    }
    Ok(())
}

fn set_i64<F: FnMut(&str) -> Option<String>>(lookup: &mut F, name: &str, slot: &mut i64) -> Result<()> {
    if let Some(raw) = lookup(name) {
        *slot = parse_env(name, &raw)?;
    }
    Ok(())
}

fn set_bool<F: FnMut(&str) -> Option<String>>(lookup: &mut F, name: &str, slot: &mut bool) -> Result<()> {
    if let Some(raw) = lookup(name) {
        *slot = parse_env(name, &raw)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Config, StatusError};
    use std::collections::HashMap;
    use std::path::Path;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sync.auto_open_gap_blocks, 50);
        assert_eq!(cfg.modal.completion_message, "blockchain fully synced");
        assert!(cfg.modal.default_closable);
    }

    #[test]
    fn ewma_alpha_ordering_enforced() {
        let mut cfg = Config::default();
        cfg.rate.min_alpha = 0.5;
        cfg.rate.base_alpha = 0.3;
        let err = cfg.validate().expect_err("expected alpha ordering failure");
        match err {
            StatusError::InvalidConfig { details } => assert!(details.contains("alpha")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_gap_threshold_rejected() {
        let mut cfg = Config::default();
        cfg.sync.auto_open_gap_blocks = -1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_completion_message_rejected() {
        let mut cfg = Config::default();
        cfg.modal.completion_message = "   ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let mut cfg = Config::default();
        cfg.ingest.poll_interval_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env = vars(&[
            ("WSS_SYNC_AUTO_OPEN_GAP_BLOCKS", "120"),
            ("WSS_MODAL_ENABLE_CLOSE", "false"),
            ("WSS_MODAL_COMPLETION_MESSAGE", "synced"),
            ("WSS_RATE_MIN_SAMPLES", "5"),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env_overrides_from(|name| env.get(name).cloned())
            .expect("overrides parse");
        assert_eq!(cfg.sync.auto_open_gap_blocks, 120);
        assert!(!cfg.modal.enable_close);
        assert_eq!(cfg.modal.completion_message, "synced");
        assert_eq!(cfg.rate.min_samples, 5);
    }

    #[test]
    fn env_invalid_boolean_rejected() {
        let env = vars(&[("WSS_MODAL_ENABLE_CLOSE", "maybe")]);
        let mut cfg = Config::default();
        let err = cfg
            .apply_env_overrides_from(|name| env.get(name).cloned())
            .expect_err("invalid bool must fail");
        assert_eq!(err.code(), "WSS-1003");
    }

    #[test]
    fn toml_sections_parse_with_defaults_for_missing_keys() {
        let raw = r#"
            [sync]
            auto_open_gap_blocks = 10

            [modal]
            close_on_escape = false
        "#;
        let cfg: Config = toml::from_str(raw).expect("parse");
        assert_eq!(cfg.sync.auto_open_gap_blocks, 10);
        assert!(cfg.sync.suppress_after_dismiss);
        assert!(!cfg.modal.close_on_escape);
        assert!(cfg.modal.enable_close);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ingest]\npoll_interval_ms = 250\n").unwrap();
        let cfg = Config::load(Some(&path)).expect("load");
        assert_eq!(cfg.ingest.poll_interval_ms, 250);
        assert_eq!(cfg.paths.config_file, path);
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let err = Config::load(Some(Path::new("/nonexistent_wss/config.toml")))
            .expect_err("missing explicit config");
        assert!(matches!(err, StatusError::MissingConfig { .. }));
    }

    #[test]
    fn stable_hash_changes_when_config_changes() {
        let cfg = Config::default();
        let before = cfg.stable_hash().expect("hash");
        assert_eq!(before, cfg.stable_hash().expect("hash"));

        let mut changed = cfg;
        changed.sync.auto_open_gap_blocks = 51;
        assert_ne!(before, changed.stable_hash().expect("hash"));
    }

    #[test]
    fn to_toml_round_trips_through_parser() {
        let cfg = Config::default();
        let rendered = cfg.to_toml().expect("render");
        let parsed: Config = toml::from_str(&rendered).expect("reparse");
        assert_eq!(parsed, cfg);
    }
}
