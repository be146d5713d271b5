//! Core types: errors, configuration, cleanup levels.

pub mod config;
pub mod errors;
pub mod level;
