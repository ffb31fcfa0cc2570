//! Query EXPLAIN Parser Module
//!
//! Turns PostgreSQL `EXPLAIN (ANALYZE, FORMAT JSON)` output into a typed
//! [`QueryPlan`] tree.
//!
//! # Example
//!
//! ```
//! use pgex_analyzer::explain::{parse_explain_json, NodeType};
//!
//! let pg_json = r#"[{"Plan": {"Node Type": "Seq Scan", "Relation Name": "users"}}]"#;
//! let plan = parse_explain_json(pg_json).unwrap();
//! assert_eq!(plan.root.kind(), NodeType::SeqScan);
//! assert!(plan.has_sequential_scans());
//! ```

pub mod plan;
pub mod postgres;

pub use plan::{NodeType, PlanNode, PlanNodeIterator, QueryPlan};
pub use postgres::{ExplainError, parse_explain_json, parse_explain_value};
