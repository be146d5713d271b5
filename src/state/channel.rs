//! State channels: the append-only key-value hand-off from pre-step to post-step.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::errors::{MdsError, Result};

/// Narrow persistence interface so the orchestrator convention can change
/// without touching step logic.
pub trait StateChannel {
    /// Append every entry of `mapping` to the channel.
    fn persist(&mut self, mapping: &BTreeMap<String, String>) -> Result<()>;
    /// Raw value for `key`, if the channel holds one.
    fn read(&self, key: &str) -> Option<String>;
}

/// GitHub Actions convention: the pre-step appends `key=value` lines to the
/// file named by `GITHUB_STATE`; the runner re-exposes them to the post-step
/// as `STATE_<key>` environment variables.
#[derive(Debug, Clone)]
pub struct GithubStateChannel {
    state_file: Option<PathBuf>,
    env_prefix: String,
    vars: HashMap<String, String>,
}

impl GithubStateChannel {
    #[must_use]
    pub fn new(
        state_file: Option<PathBuf>,
        env_prefix: impl Into<String>,
        vars: HashMap<String, String>,
    ) -> Self {
        Self {
            state_file,
            env_prefix: env_prefix.into(),
            vars,
        }
    }

    /// Snapshot the live process environment.
    #[must_use]
    pub fn from_env(env_prefix: &str) -> Self {
        let vars: HashMap<String, String> = env::vars().collect();
        let state_file = vars
            .get("GITHUB_STATE")
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);
        Self::new(state_file, env_prefix, vars)
    }
}

impl StateChannel for GithubStateChannel {
    fn persist(&mut self, mapping: &BTreeMap<String, String>) -> Result<()> {
        let Some(path) = &self.state_file else {
            return Err(MdsError::Persistence {
                details: "GITHUB_STATE is not set".to_string(),
            });
        };
        append_entries(path, mapping)
    }

    fn read(&self, key: &str) -> Option<String> {
        self.vars.get(&format!("{}{key}", self.env_prefix)).cloned()
    }
}

/// A plain state file read back directly. Later lines override earlier ones.
#[derive(Debug, Clone)]
pub struct FileStateChannel {
    path: PathBuf,
}

impl FileStateChannel {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateChannel for FileStateChannel {
    fn persist(&mut self, mapping: &BTreeMap<String, String>) -> Result<()> {
        append_entries(&self.path, mapping)
    }

    fn read(&self, key: &str) -> Option<String> {
        // Missing or unreadable file reads as an empty channel.
        let raw = fs::read_to_string(&self.path).ok()?;
        parse_state_lines(&raw)
            .into_iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// In-memory channel for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateChannel {
    entries: BTreeMap<String, String>,
    persist_calls: usize,
}

impl MemoryStateChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn persist_calls(&self) -> usize {
        self.persist_calls
    }

    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl StateChannel for MemoryStateChannel {
    fn persist(&mut self, mapping: &BTreeMap<String, String>) -> Result<()> {
        validate_entries(mapping)?;
        self.persist_calls += 1;
        self.entries
            .extend(mapping.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

/// Parse `key=value` lines. Lines without `=` or with an empty key are skipped.
#[must_use]
pub fn parse_state_lines(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim_end_matches('\r').to_string()))
        })
        .collect()
}

fn validate_entries(mapping: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in mapping {
        if key.is_empty() || key.contains(['=', '\n', '\r']) {
            return Err(MdsError::Persistence {
                details: format!("invalid state key {key:?}"),
            });
        }
        if value.contains(['\n', '\r']) {
            return Err(MdsError::Persistence {
                details: format!("state value for {key} contains a line break"),
            });
        }
    }
    Ok(())
}

fn append_entries(path: &Path, mapping: &BTreeMap<String, String>) -> Result<()> {
    validate_entries(mapping)?;
    let payload: String = mapping
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect();

    let persistence = |error: io::Error| MdsError::Persistence {
        details: format!("cannot append to {}: {error}", path.display()),
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(persistence)?;
    file.write_all(payload.as_bytes()).map_err(persistence)?;
    file.flush().map_err(persistence)
}
