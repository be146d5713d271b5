#![forbid(unsafe_code)]

//! More Disk Space (mds): reclaims disk space on CI runners by deleting large
//! preinstalled toolchains before a job, then reports what is left after it.
//!
//! Two steps share a small persisted hand-off:
//! 1. **Pre-step**: validate the cleanup level, detect the runner, persist
//!    state, measure, remove the targets the level selects, measure again.
//! 2. **Post-step**: read the state back, measure, and suggest a level for the
//!    next run.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use more_disk_space::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use more_disk_space::core::level::CleanupLevel;
//! use more_disk_space::policy::targets::targets_for;
//! ```

pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
pub mod core;
pub mod logger;
pub mod metrics;
pub mod platform;
pub mod policy;
pub mod report;
pub mod state;
pub mod steps;
