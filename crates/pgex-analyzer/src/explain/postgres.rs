//! PostgreSQL EXPLAIN Parser
//!
//! Parses the JSON document produced by `EXPLAIN (ANALYZE, FORMAT JSON)`.
//! The report is normally a one-element array wrapping an object with
//! `"Plan"`, `"Planning Time"` and `"Execution Time"` keys; a bare object
//! is accepted as well.
//!
//! # Examples
//!
//! ```
//! use pgex_analyzer::explain::postgres::parse_explain_json;
//!
//! let json_output = r#"[
//!   {
//!     "Plan": {
//!       "Node Type": "Seq Scan",
//!       "Relation Name": "users",
//!       "Plan Rows": 100,
//!       "Actual Rows": 98,
//!       "Actual Total Time": 0.4
//!     },
//!     "Execution Time": 0.5
//!   }
//! ]"#;
//!
//! let plan = parse_explain_json(json_output).unwrap();
//! assert_eq!(plan.root.relation, "users");
//! assert_eq!(plan.execution_time, 0.5);
//! ```

use crate::explain::plan::{PlanNode, QueryPlan};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur when parsing an EXPLAIN report
#[derive(Debug, Error)]
pub enum ExplainError {
    /// The input is not valid JSON
    #[error("Invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The JSON decoded, but an object is missing where one is required
    #[error("Invalid plan structure: {0}")]
    Shape(String),
}

/// Result type for EXPLAIN parsing
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Parses `EXPLAIN (ANALYZE, FORMAT JSON)` output
///
/// Deeply nested plans (long join chains, nested subqueries) routinely go past
/// serde_json's default nesting limit, so decoding runs without that limit on
/// a stack that grows on demand.
pub fn parse_explain_json(json: &str) -> Result<QueryPlan> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    parse_explain_value(&value)
}

/// Builds a plan from an already decoded report
pub fn parse_explain_value(value: &Value) -> Result<QueryPlan> {
    // PostgreSQL wraps the report in an array; only the first entry is used
    let report = match value {
        Value::Array(entries) => entries
            .first()
            .ok_or_else(|| ExplainError::Shape("EXPLAIN output is an empty array".into()))?,
        other => other,
    };

    let fields = report.as_object().ok_or_else(|| {
        ExplainError::Shape(format!(
            "expected an object at the report root, found {}",
            json_kind(report)
        ))
    })?;

    // A flattened report carries the root node's fields directly
    let root = parse_plan_tree(fields.get("Plan").unwrap_or(report))?;

    let plan = QueryPlan::new(root)
        .with_planning_time(float_field(fields, "Planning Time").unwrap_or(0.0))
        .with_execution_time(float_field(fields, "Execution Time").unwrap_or(0.0));

    tracing::debug!(
        nodes = plan.node_count(),
        planning_ms = plan.planning_time,
        execution_ms = plan.execution_time,
        "Parsed EXPLAIN report"
    );

    Ok(plan)
}

/// Builds the node tree without recursion: a node is finished once all of
/// its `"Plans"` entries are, then handed to its parent on the stack
fn parse_plan_tree(value: &Value) -> Result<PlanNode> {
    let mut ancestors: Vec<PendingNode<'_>> = Vec::new();
    let mut current = PendingNode::new(value)?;

    loop {
        if let Some(child) = current.next_child() {
            let pending = PendingNode::new(child)?;
            ancestors.push(std::mem::replace(&mut current, pending));
            continue;
        }

        let node = current.finish();
        match ancestors.pop() {
            Some(mut parent) => {
                parent.children.push(node);
                current = parent;
            }
            None => return Ok(node),
        }
    }
}

/// A plan object whose children are still being built
struct PendingNode<'a> {
    fields: &'a Map<String, Value>,
    plans: &'a [Value],
    children: Vec<PlanNode>,
}

impl<'a> PendingNode<'a> {
    fn new(value: &'a Value) -> Result<Self> {
        let fields = value.as_object().ok_or_else(|| {
            ExplainError::Shape(format!(
                "plan node must be an object, found {}",
                json_kind(value)
            ))
        })?;
        let plans = fields
            .get("Plans")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(Self {
            fields,
            plans,
            children: Vec::with_capacity(plans.len()),
        })
    }

    fn next_child(&self) -> Option<&'a Value> {
        self.plans.get(self.children.len())
    }

    fn finish(self) -> PlanNode {
        let fields = self.fields;
        PlanNode {
            node_type: str_field(fields, "Node Type").unwrap_or("Unknown").to_string(),
            relation: str_field(fields, "Relation Name").unwrap_or_default().to_string(),
            alias: str_field(fields, "Alias").unwrap_or_default().to_string(),
            startup_cost: float_field(fields, "Startup Cost").unwrap_or(0.0),
            total_cost: float_field(fields, "Total Cost").unwrap_or(0.0),
            rows_estimated: count_field(fields, "Plan Rows").unwrap_or(0),
            rows_actual: count_field(fields, "Actual Rows").unwrap_or(0),
            actual_time: float_field(fields, "Actual Total Time").unwrap_or(0.0),
            loops: count_field(fields, "Actual Loops").unwrap_or(1),
            filter: resolve_filter(fields).to_string(),
            index_name: str_field(fields, "Index Name").unwrap_or_default().to_string(),
            children: self.children,
        }
    }
}

/// "Filter" wins when present and non-empty, otherwise "Index Cond"
fn resolve_filter(fields: &Map<String, Value>) -> &str {
    str_field(fields, "Filter")
        .filter(|filter| !filter.is_empty())
        .or_else(|| str_field(fields, "Index Cond"))
        .unwrap_or_default()
}

fn str_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

fn float_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields.get(key).and_then(Value::as_f64)
}

/// Row and loop counts; PostgreSQL 18 may report fractional per-loop rows
fn count_field(fields: &Map<String, Value>, key: &str) -> Option<u64> {
    let value = fields.get(key)?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round() as u64)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests;
