//! Fixed removal table: preinstalled toolchains ordered by reclaim rate.
//!
//! Tiers follow measured GiB/sec on hosted images, cheapest wins first:
//! - tier 1: swift, chromium (4-6 GiB/s)
//! - tier 2: aws-cli, haskell (0.5-0.6 GiB/s)
//! - tier 3: miniconda, dotnet (~0.2 GiB/s)
//! - tier 4: android (~0.1 GiB/s), alone so it can be skipped on its own

use std::path::Path;

use serde::Serialize;

use crate::core::level::CleanupLevel;

/// One labelled removal target; all paths are attempted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovalTarget {
    pub label: &'static str,
    pub paths: &'static [&'static str],
    pub tier: u8,
}

impl RemovalTarget {
    /// Whether this target runs at `level`.
    #[must_use]
    pub fn selected_at(&self, level: CleanupLevel) -> bool {
        self.tier <= level.get()
    }

    pub fn path_iter(&self) -> impl Iterator<Item = &'static Path> {
        self.paths.iter().map(Path::new)
    }
}

/// The removal table, sorted by tier.
pub static REMOVAL_TARGETS: [RemovalTarget; 7] = [
    RemovalTarget {
        label: "swift",
        paths: &["/usr/share/swift"],
        tier: 1,
    },
    RemovalTarget {
        label: "chromium",
        paths: &["/usr/local/share/chromium"],
        tier: 1,
    },
    RemovalTarget {
        label: "aws-cli",
        paths: &["/usr/local/aws-cli"],
        tier: 2,
    },
    RemovalTarget {
        label: "haskell",
        paths: &["/usr/local/.ghcup", "/opt/ghc"],
        tier: 2,
    },
    RemovalTarget {
        label: "miniconda",
        paths: &["/usr/share/miniconda"],
        tier: 3,
    },
    RemovalTarget {
        label: "dotnet",
        paths: &["/usr/share/dotnet"],
        tier: 3,
    },
    RemovalTarget {
        label: "android",
        paths: &["/usr/local/lib/android"],
        tier: 4,
    },
];

/// Targets selected at `level`, in execution order.
pub fn targets_for(level: CleanupLevel) -> impl Iterator<Item = &'static RemovalTarget> {
    REMOVAL_TARGETS
        .iter()
        .filter(move |target| target.selected_at(level))
}
