//! Cleanup level: the closed set {1, 2, 3, 4} selecting how aggressive a run is.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{MdsError, Result};

/// Level used when the caller supplies nothing.
pub const DEFAULT_LEVEL_INPUT: &str = "2";

/// A validated cleanup level. Higher levels remove strictly more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CleanupLevel(u8);

impl CleanupLevel {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(4);
    pub const DEFAULT: Self = Self(2);

    /// Build a level from a number, rejecting anything outside 1..=4.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN.0 && value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Parse raw operator input. Only a single digit 1-4 is accepted; no
    /// whitespace trimming, signs or leading zeros.
    pub fn parse(raw: &str) -> Result<Self> {
        if !level_pattern()?.is_match(raw) {
            return Err(MdsError::InvalidLevel {
                raw: raw.to_string(),
            });
        }
        raw.parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| MdsError::InvalidLevel {
                raw: raw.to_string(),
            })
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Next level up, or `None` at the top.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// Next level down, or `None` at the bottom.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        Self::new(self.0 - 1)
    }

    /// Every level in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN.0..=Self::MAX.0).map(Self)
    }
}

impl Default for CleanupLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CleanupLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for CleanupLevel {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("level {value} outside 1..=4"))
    }
}

impl From<CleanupLevel> for u8 {
    fn from(level: CleanupLevel) -> Self {
        level.0
    }
}

fn level_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[1-4]$"))
        .as_ref()
        .map_err(|err| MdsError::InvalidConfig {
            details: format!("level pattern failed to compile: {err}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_valid_level() {
        for (raw, expected) in [("1", 1), ("2", 2), ("3", 3), ("4", 4)] {
            assert_eq!(CleanupLevel::parse(raw).unwrap().get(), expected);
        }
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        for raw in ["0", "5", "", "abc", " 2", "2 ", "02", "+3", "-1", "12", "2\n"] {
            let err = CleanupLevel::parse(raw).expect_err(raw);
            assert_eq!(err.code(), "MDS-1001", "input {raw:?}");
        }
    }

    #[test]
    fn default_input_parses_to_default_level() {
        assert_eq!(
            CleanupLevel::parse(DEFAULT_LEVEL_INPUT).unwrap(),
            CleanupLevel::DEFAULT
        );
    }

    #[test]
    fn next_and_previous_stop_at_bounds() {
        assert_eq!(CleanupLevel::MAX.next(), None);
        assert_eq!(CleanupLevel::MIN.previous(), None);
        assert_eq!(CleanupLevel::MIN.next(), CleanupLevel::new(2));
        assert_eq!(CleanupLevel::MAX.previous(), CleanupLevel::new(3));
    }

    #[test]
    fn all_is_ascending_and_complete() {
        let levels: Vec<u8> = CleanupLevel::all().map(CleanupLevel::get).collect();
        assert_eq!(levels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn serde_uses_plain_numbers() {
        let json = serde_json::to_string(&CleanupLevel::new(3).unwrap()).unwrap();
        assert_eq!(json, "3");
        assert!(serde_json::from_str::<CleanupLevel>("7").is_err());
    }
}
