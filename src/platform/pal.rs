//! PAL trait: free-space probes and privileged recursive removal.

#![allow(missing_docs)]

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use parking_lot::Mutex;

use crate::core::config::{Config, SpaceProbe};
use crate::core::errors::{MdsError, Result};

/// One gibibyte.
pub const GIB: u64 = 1 << 30;

/// OS abstraction used by the cleanup and report steps.
pub trait Platform {
    /// Whole GiB available on the filesystem holding `root`, truncated.
    fn available_gib(&self, root: &Path) -> Result<u64>;
    /// Recursively and unconditionally delete `path`.
    fn remove_tree(&self, path: &Path) -> Result<()>;
}

/// Linux implementation backed by `statvfs`/`df` and `rm -rf`.
#[derive(Debug, Clone)]
pub struct LinuxPlatform {
    probe: SpaceProbe,
    use_sudo: bool,
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new(SpaceProbe::default(), true)
    }
}

impl LinuxPlatform {
    #[must_use]
    pub fn new(probe: SpaceProbe, use_sudo: bool) -> Self {
        Self { probe, use_sudo }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.measurement.probe, config.removal.use_sudo)
    }

    fn needs_sudo(&self) -> bool {
        self.use_sudo && !running_as_root()
    }

    fn removal_command(&self, path: &Path) -> Command {
        let mut cmd = if self.needs_sudo() {
            let mut sudo = Command::new("sudo");
            sudo.args(["-n", "rm", "-rf", "--"]);
            sudo
        } else {
            let mut rm = Command::new("rm");
            rm.args(["-rf", "--"]);
            rm
        };
        cmd.arg(path).stdin(Stdio::null());
        cmd
    }
}

impl Platform for LinuxPlatform {
    fn available_gib(&self, root: &Path) -> Result<u64> {
        match self.probe {
            SpaceProbe::Statvfs => statvfs_available_gib(root),
            SpaceProbe::Df => df_available_gib(root),
        }
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        // Other stat failures (unreadable parents without sudo) are left to rm.
        if let Err(err) = fs::symlink_metadata(path)
            && err.kind() == io::ErrorKind::NotFound
        {
            return Err(MdsError::PathMissing {
                path: path.to_path_buf(),
            });
        }

        let output = self
            .removal_command(path)
            .output()
            .map_err(|source| MdsError::io(path, source))?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(MdsError::RemovalFailed {
            path: path.to_path_buf(),
            details: if stderr.is_empty() {
                format!("rm exited with {}", output.status)
            } else {
                stderr
            },
        })
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

#[cfg(unix)]
fn statvfs_available_gib(root: &Path) -> Result<u64> {
    let stat = nix::sys::statvfs::statvfs(root).map_err(|error| MdsError::Measurement {
        path: root.to_path_buf(),
        details: error.to_string(),
    })?;
    let fragment = stat.fragment_size();
    Ok(stat.blocks_available().saturating_mul(fragment) / GIB)
}

#[cfg(not(unix))]
fn statvfs_available_gib(root: &Path) -> Result<u64> {
    Err(MdsError::Measurement {
        path: root.to_path_buf(),
        details: "statvfs is only available on unix".to_string(),
    })
}

fn df_available_gib(root: &Path) -> Result<u64> {
    let output = Command::new("df")
        .args(["--output=avail", "-B1"])
        .arg(root)
        .stdin(Stdio::null())
        .output()
        .map_err(|error| MdsError::Measurement {
            path: root.to_path_buf(),
            details: format!("failed to run df: {error}"),
        })?;
    if !output.status.success() {
        return Err(MdsError::Measurement {
            path: root.to_path_buf(),
            details: format!(
                "df exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_df_avail(&stdout).ok_or_else(|| MdsError::Measurement {
        path: root.to_path_buf(),
        details: format!("unparseable df output: {:?}", stdout.trim()),
    })
}

/// Whole GiB from `df --output=avail -B1` (header line, then the byte count
/// on the last non-empty line). Truncates like the statvfs probe.
pub fn parse_df_avail(stdout: &str) -> Option<u64> {
    let value = stdout.lines().map(str::trim).rfind(|line| !line.is_empty())?;
    value.parse::<u64>().ok().map(|bytes| bytes / GIB)
}

// ──────────────────── mock ────────────────────

/// A platform call recorded by [`MockPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Measure(PathBuf),
    Remove(PathBuf),
}

#[derive(Debug, Clone)]
enum MockSample {
    Gib(u64),
    Fail(String),
}

/// In-memory mock implementation for deterministic tests.
///
/// Samples are consumed in order; the last one repeats once the queue is
/// down to a single entry. With no samples configured every measurement
/// fails.
#[derive(Debug, Default)]
pub struct MockPlatform {
    samples: Mutex<VecDeque<MockSample>>,
    missing: HashSet<PathBuf>,
    denied: HashSet<PathBuf>,
    deny_all: bool,
    calls: Mutex<Vec<PlatformCall>>,
}

impl MockPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_samples(self, samples: impl IntoIterator<Item = u64>) -> Self {
        self.samples
            .lock()
            .extend(samples.into_iter().map(MockSample::Gib));
        self
    }

    #[must_use]
    pub fn with_measurement_failure(self, details: &str) -> Self {
        self.samples
            .lock()
            .push_back(MockSample::Fail(details.to_string()));
        self
    }

    /// Removal of `path` reports the path as absent.
    #[must_use]
    pub fn with_missing(mut self, path: impl Into<PathBuf>) -> Self {
        self.missing.insert(path.into());
        self
    }

    /// Removal of `path` fails with a permission error.
    #[must_use]
    pub fn with_denied(mut self, path: impl Into<PathBuf>) -> Self {
        self.denied.insert(path.into());
        self
    }

    /// Every removal fails with a permission error.
    #[must_use]
    pub fn deny_all_removals(mut self) -> Self {
        self.deny_all = true;
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn measure_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, PlatformCall::Measure(_)))
            .count()
    }

    /// Paths passed to `remove_tree`, in call order, successful or not.
    #[must_use]
    pub fn removal_attempts(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Remove(path) => Some(path.clone()),
                PlatformCall::Measure(_) => None,
            })
            .collect()
    }
}

impl Platform for MockPlatform {
    fn available_gib(&self, root: &Path) -> Result<u64> {
        self.calls
            .lock()
            .push(PlatformCall::Measure(root.to_path_buf()));
        let sample = {
            let mut samples = self.samples.lock();
            if samples.len() > 1 {
                samples.pop_front()
            } else {
                samples.front().cloned()
            }
        };
        match sample {
            Some(MockSample::Gib(value)) => Ok(value),
            Some(MockSample::Fail(details)) => Err(MdsError::Measurement {
                path: root.to_path_buf(),
                details,
            }),
            None => Err(MdsError::Measurement {
                path: root.to_path_buf(),
                details: "mock has no samples".to_string(),
            }),
        }
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        self.calls
            .lock()
            .push(PlatformCall::Remove(path.to_path_buf()));
        if self.missing.contains(path) {
            return Err(MdsError::PathMissing {
                path: path.to_path_buf(),
            });
        }
        if self.deny_all || self.denied.contains(path) {
            return Err(MdsError::RemovalFailed {
                path: path.to_path_buf(),
                details: "Permission denied".to_string(),
            });
        }
        Ok(())
    }
}
