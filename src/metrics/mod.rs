//! Aggregation over recorded activity logs.

pub mod summary;
