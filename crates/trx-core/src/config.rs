//! Configuration system for the transceiver.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TRX_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/transceiver/config.toml
//!   3. ~/.config/transceiver/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::wire::{JOIN_TIMEOUT_MS, PROBE_WINDOW_MS, SCAN_INTERVAL_MS};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrxConfig {
    pub identity: IdentityConfig,
    pub protocol: ProtocolConfig,
    pub medium: MediumConfig,
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Display name used when hosting or joining. Empty = ask at runtime.
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Period between discovery scan cycles.
    pub scan_interval_ms: u64,
    /// How long each discovery probe collects pongs.
    pub probe_window_ms: u64,
    /// How long a guest waits for the host's verdict.
    pub join_timeout_ms: u64,
    /// What happens to slots that stay silent for a whole scan cycle.
    pub directory_policy: DirectoryPolicy,
}

/// Reconciliation rule for the channel directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryPolicy {
    /// Slots only ever become active. A host that leaves keeps showing as
    /// active until this context restarts.
    #[default]
    Accumulate,
    /// At the end of each cycle, slots that produced no pong revert to their
    /// default inactive entry.
    Reconcile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediumConfig {
    /// false = behave as if the broadcast capability is missing.
    pub enabled: bool,
    /// Per-topic buffer. Slow endpoints that fall further behind lose envelopes.
    pub capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// false = every check passes (fail-open).
    pub enabled: bool,
    /// Case-insensitive substrings that mark a name unsafe.
    pub blocked_terms: Vec<String>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: SCAN_INTERVAL_MS,
            probe_window_ms: PROBE_WINDOW_MS,
            join_timeout_ms: JOIN_TIMEOUT_MS,
            directory_policy: DirectoryPolicy::Accumulate,
        }
    }
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 256,
        }
    }
}

impl ProtocolConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn probe_window(&self) -> Duration {
        Duration::from_millis(self.probe_window_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("transceiver")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TrxConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = Self::load_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(TrxConfig::default());
        }
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TRX_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&TrxConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply TRX_* overrides from `lookup` (the process env in `load`).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let flag = |v: String| v == "true" || v == "1";

        if let Some(v) = lookup("TRX_IDENTITY__USER_NAME") {
            self.identity.user_name = v;
        }
        if let Some(ms) = lookup("TRX_PROTOCOL__SCAN_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.protocol.scan_interval_ms = ms;
        }
        if let Some(ms) = lookup("TRX_PROTOCOL__PROBE_WINDOW_MS").and_then(|v| v.parse().ok()) {
            self.protocol.probe_window_ms = ms;
        }
        if let Some(ms) = lookup("TRX_PROTOCOL__JOIN_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.protocol.join_timeout_ms = ms;
        }
        if let Some(v) = lookup("TRX_PROTOCOL__DIRECTORY_POLICY") {
            match v.as_str() {
                "accumulate" => self.protocol.directory_policy = DirectoryPolicy::Accumulate,
                "reconcile" => self.protocol.directory_policy = DirectoryPolicy::Reconcile,
                _ => {}
            }
        }
        if let Some(v) = lookup("TRX_MEDIUM__ENABLED") {
            self.medium.enabled = flag(v);
        }
        if let Some(v) = lookup("TRX_SAFETY__ENABLED") {
            self.safety.enabled = flag(v);
        }
    }
}
