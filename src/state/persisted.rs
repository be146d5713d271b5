//! The persisted tuple and its lenient decoding.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::errors::Result;
use crate::core::level::CleanupLevel;
use crate::platform::env::EnvironmentFacts;
use crate::state::channel::StateChannel;

pub const KEY_LEVEL: &str = "level";
pub const KEY_GITHUB_HOSTED: &str = "githubHosted";
pub const KEY_SUPPORTED_PLATFORM: &str = "supportedPlatform";

/// What the pre-step hands to the post-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistedState {
    pub level: CleanupLevel,
    pub github_hosted: bool,
    pub supported_platform: bool,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            level: CleanupLevel::DEFAULT,
            github_hosted: false,
            supported_platform: false,
        }
    }
}

impl PersistedState {
    #[must_use]
    pub fn new(level: CleanupLevel, facts: EnvironmentFacts) -> Self {
        Self {
            level,
            github_hosted: facts.github_hosted,
            supported_platform: facts.supported_platform,
        }
    }

    /// String encoding written to the channel.
    #[must_use]
    pub fn to_mapping(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (KEY_LEVEL.to_string(), self.level.to_string()),
            (KEY_GITHUB_HOSTED.to_string(), self.github_hosted.to_string()),
            (
                KEY_SUPPORTED_PLATFORM.to_string(),
                self.supported_platform.to_string(),
            ),
        ])
    }

    /// Write all three keys in one append.
    pub fn persist(&self, channel: &mut dyn StateChannel) -> Result<()> {
        channel.persist(&self.to_mapping())
    }

    /// Read back, substituting the default for any absent or malformed key.
    /// Never fails.
    #[must_use]
    pub fn read(channel: &dyn StateChannel) -> Self {
        let defaults = Self::default();
        Self {
            level: read_level(channel, KEY_LEVEL, defaults.level),
            github_hosted: read_bool(channel, KEY_GITHUB_HOSTED, defaults.github_hosted),
            supported_platform: read_bool(
                channel,
                KEY_SUPPORTED_PLATFORM,
                defaults.supported_platform,
            ),
        }
    }
}

/// Decode a level; anything but a whole number in 1..=4 yields `default`.
pub fn read_level(channel: &dyn StateChannel, key: &str, default: CleanupLevel) -> CleanupLevel {
    channel
        .read(key)
        .and_then(|raw| raw.trim().parse::<u8>().ok())
        .and_then(CleanupLevel::new)
        .unwrap_or(default)
}

/// Decode a flag; only `true`/`false` are recognized.
pub fn read_bool(channel: &dyn StateChannel, key: &str, default: bool) -> bool {
    match channel.read(key).as_deref().map(str::trim) {
        Some("true") => true,
        Some("false") => false,
        _ => default,
    }
}
