//! Runner environment detection from process environment variables.

use std::env;

use serde::{Deserialize, Serialize};

/// Facts about the execution context, captured once at pre-step start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentFacts {
    /// Vendor-managed ephemeral runner (as opposed to self-hosted/unknown).
    pub github_hosted: bool,
    /// Operating system on which removal is supported (Linux only).
    pub supported_platform: bool,
}

impl EnvironmentFacts {
    /// Detect from the live process environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_from(|name| env::var(name).ok())
    }

    /// Detect from an arbitrary lookup. Absent or unrecognized values yield
    /// "not hosted" and "unsupported".
    pub fn detect_from<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let github_hosted = lookup("RUNNER_ENVIRONMENT")
            .is_some_and(|raw| raw.trim().eq_ignore_ascii_case("github-hosted"));
        let supported_platform =
            lookup("RUNNER_OS").is_some_and(|raw| raw.trim().eq_ignore_ascii_case("linux"));
        Self {
            github_hosted,
            supported_platform,
        }
    }

    /// Removal runs only on a hosted runner of a supported OS.
    #[must_use]
    pub const fn removal_allowed(&self) -> bool {
        self.github_hosted && self.supported_platform
    }
}

/// Runner image identity (`ImageOS/ImageVersion`), used to group activity
/// records. `None` when the runner does not advertise an image.
pub fn detect_runner_image<F>(mut lookup: F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let os = lookup("ImageOS")
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())?;
    match lookup("ImageVersion")
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
    {
        Some(version) => Some(format!("{os}/{version}")),
        None => Some(os),
    }
}
