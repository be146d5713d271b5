//! Tiered removal policy: the static target table and its executor.

pub mod executor;
pub mod targets;
