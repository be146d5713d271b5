//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{MdsError, Result};

/// Full configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub measurement: MeasurementConfig,
    pub removal: RemovalConfig,
    pub state: StateConfig,
    pub paths: PathsConfig,
}

/// How free space is sampled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Filesystem whose free space is reported.
    pub root: PathBuf,
    pub probe: SpaceProbe,
}

/// Free-space probe backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpaceProbe {
    /// `statvfs(2)` on the root path.
    #[default]
    Statvfs,
    /// `df --output=avail -B1 <root>`, truncated to whole GiB.
    Df,
}

impl SpaceProbe {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "statvfs" => Some(Self::Statvfs),
            "df" => Some(Self::Df),
            _ => None,
        }
    }
}

/// Removal command behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemovalConfig {
    /// Prefix deletes with `sudo` when not already running as root.
    pub use_sudo: bool,
}

/// State hand-off between the pre-step and the post-step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StateConfig {
    /// Prefix the orchestrator puts in front of persisted keys when it
    /// re-exposes them as environment variables.
    pub env_prefix: String,
}

/// Filesystem paths used by mds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// Optional JSONL activity log; `None` disables structured logging.
    pub activity_log: Option<PathBuf>,
    /// Used when `activity_log` cannot be opened or written.
    pub activity_log_fallback: Option<PathBuf>,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            probe: SpaceProbe::default(),
        }
    }
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self { use_sudo: true }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            env_prefix: "STATE_".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[MDS-CONFIG] WARNING: HOME not set, falling back to /tmp for config path"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("mds").join("config.toml"),
            activity_log: None,
            activity_log_fallback: None,
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
        Self::load_with(path, env_var)
    }

    /// Same as [`Config::load`] with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| MdsError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(MdsError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a so the value is stable across processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MDS_ROOT") {
            self.measurement.root = PathBuf::from(raw);
        }

        if let Some(raw) = lookup("MDS_SPACE_PROBE") {
            self.measurement.probe =
                SpaceProbe::parse(&raw).ok_or_else(|| MdsError::ConfigParse {
                    context: "env",
                    details: format!("MDS_SPACE_PROBE={raw:?}: expected statvfs or df"),
                })?;
        }

        if let Some(raw) = lookup("MDS_USE_SUDO") {
            self.removal.use_sudo = parse_env_bool("MDS_USE_SUDO", &raw)?;
        }

        if let Some(raw) = lookup("MDS_STATE_PREFIX") {
            self.state.env_prefix = raw;
        }

        if let Some(raw) = lookup("MDS_ACTIVITY_LOG") {
            self.paths.activity_log = Some(PathBuf::from(raw));
        }

        if let Some(raw) = lookup("MDS_ACTIVITY_LOG_FALLBACK") {
            self.paths.activity_log_fallback = Some(PathBuf::from(raw));
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.measurement.root.is_absolute() {
            return Err(MdsError::InvalidConfig {
                details: format!(
                    "measurement.root must be absolute, got {}",
                    self.measurement.root.display()
                ),
            });
        }
        if self.state.env_prefix.contains('=') {
            return Err(MdsError::InvalidConfig {
                details: "state.env_prefix must not contain '='".to_string(),
            });
        }
        for (key, log) in [
            ("paths.activity_log", &self.paths.activity_log),
            ("paths.activity_log_fallback", &self.paths.activity_log_fallback),
        ] {
            if let Some(log) = log
                && log.as_os_str().is_empty()
            {
                return Err(MdsError::InvalidConfig {
                    details: format!("{key} must not be empty"),
                });
            }
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| MdsError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
