//! pg-explain analyzer - EXPLAIN ANALYZE plan parsing and analysis
//!
//! This crate provides functionality for:
//! - Parsing PostgreSQL `EXPLAIN (ANALYZE, FORMAT JSON)` reports into a plan tree
//! - Locating the slowest operator in a plan
//! - Rule-based suggestions (missing indexes, outdated statistics)

pub mod explain;
pub mod suggestions;

pub use explain::*;
pub use suggestions::*;
