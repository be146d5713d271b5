//! Logging: human step output plus an append-only JSONL activity log.

pub mod activity;
pub mod console;
pub mod jsonl;
