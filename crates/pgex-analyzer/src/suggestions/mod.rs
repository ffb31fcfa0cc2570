//! Query Analysis Suggestions Module
//!
//! Walks an execution plan to find its slowest operator and to flag common
//! problems: sequential scans over many rows and row estimates that diverge
//! sharply from what the executor actually saw.

mod analyzer;

pub use analyzer::*;
