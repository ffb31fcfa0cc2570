//! Tests for the PostgreSQL EXPLAIN parser

use super::*;
use crate::explain::plan::NodeType;
use pretty_assertions::assert_eq;

const SAMPLE_EXPLAIN: &str = r#"[
  {
    "Plan": {
      "Node Type": "Hash Join",
      "Startup Cost": 100.0,
      "Total Cost": 500.0,
      "Plan Rows": 100,
      "Actual Rows": 98,
      "Actual Total Time": 10.5,
      "Actual Loops": 1,
      "Plans": [
        {
          "Node Type": "Seq Scan",
          "Relation Name": "orders",
          "Startup Cost": 0.0,
          "Total Cost": 200.0,
          "Plan Rows": 1000,
          "Actual Rows": 1523,
          "Actual Total Time": 8.2,
          "Actual Loops": 1,
          "Filter": "date > '2025-01-01'"
        },
        {
          "Node Type": "Index Scan",
          "Relation Name": "users",
          "Index Name": "users_pkey",
          "Startup Cost": 0.15,
          "Total Cost": 8.17,
          "Plan Rows": 1,
          "Actual Rows": 1,
          "Actual Total Time": 0.02,
          "Actual Loops": 1
        }
      ]
    },
    "Planning Time": 0.12,
    "Execution Time": 10.8
  }
]"#;

// ============================================================================
// Report structure
// ============================================================================

#[test]
fn test_parse_sample_report() {
    let plan = parse_explain_json(SAMPLE_EXPLAIN).expect("parse failed");

    assert_eq!(plan.planning_time, 0.12);
    assert_eq!(plan.execution_time, 10.8);
    assert_eq!(plan.root.node_type, "Hash Join");
    assert_eq!(plan.root.children.len(), 2);
    assert_eq!((plan.root.startup_cost, plan.root.total_cost), (100.0, 500.0));
    assert_eq!((plan.root.rows_estimated, plan.root.rows_actual), (100, 98));
}

#[test]
fn test_parse_children() {
    let plan = parse_explain_json(SAMPLE_EXPLAIN).expect("parse failed");

    let seq_scan = &plan.root.children[0];
    assert_eq!(seq_scan.node_type, "Seq Scan");
    assert_eq!(seq_scan.relation, "orders");
    assert_eq!(seq_scan.filter, "date > '2025-01-01'");
    assert_eq!(seq_scan.rows_estimated, 1000);
    assert_eq!(seq_scan.rows_actual, 1523);
    assert_eq!(seq_scan.actual_time, 8.2);

    let index_scan = &plan.root.children[1];
    assert_eq!(index_scan.node_type, "Index Scan");
    assert_eq!(index_scan.index_name, "users_pkey");
    assert_eq!(index_scan.filter, "");
}

#[test]
fn test_bare_object_report() {
    let json = r#"{
        "Plan": {"Node Type": "Seq Scan", "Relation Name": "users"},
        "Planning Time": 0.3,
        "Execution Time": 1.7
    }"#;

    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.node_type, "Seq Scan");
    assert_eq!(plan.planning_time, 0.3);
    assert_eq!(plan.execution_time, 1.7);
}

#[test]
fn test_only_first_array_entry_is_used() {
    let json = r#"[
        {"Plan": {"Node Type": "Limit"}, "Execution Time": 1.0},
        {"Plan": {"Node Type": "Sort"}, "Execution Time": 2.0}
    ]"#;

    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.node_type, "Limit");
    assert_eq!(plan.execution_time, 1.0);
}

#[test]
fn test_timings_read_from_outer_object() {
    let json = r#"[{
        "Plan": {"Node Type": "Result", "Planning Time": 99.0, "Execution Time": 99.0}
    }]"#;

    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.planning_time, 0.0);
    assert_eq!(plan.execution_time, 0.0);
}

#[test]
fn test_flattened_report_uses_outer_object_as_root() {
    let json = r#"{
        "Node Type": "Seq Scan",
        "Relation Name": "events",
        "Actual Rows": 12,
        "Execution Time": 4.5
    }"#;

    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.node_type, "Seq Scan");
    assert_eq!(plan.root.relation, "events");
    assert_eq!(plan.root.rows_actual, 12);
    assert_eq!(plan.execution_time, 4.5);
}

// ============================================================================
// Field defaults
// ============================================================================

#[test]
fn test_missing_fields_take_defaults() {
    let plan = parse_explain_json(r#"[{"Plan": {}}]"#).expect("parse failed");
    let root = &plan.root;

    assert_eq!(root.node_type, "Unknown");
    assert_eq!(root.relation, "");
    assert_eq!(root.alias, "");
    assert_eq!(root.startup_cost, 0.0);
    assert_eq!(root.total_cost, 0.0);
    assert_eq!(root.rows_estimated, 0);
    assert_eq!(root.rows_actual, 0);
    assert_eq!(root.actual_time, 0.0);
    assert_eq!(root.loops, 1);
    assert_eq!(root.filter, "");
    assert_eq!(root.index_name, "");
    assert!(root.children.is_empty());
    assert_eq!(plan.planning_time, 0.0);
    assert_eq!(plan.execution_time, 0.0);
}

#[test]
fn test_wrong_typed_fields_are_absorbed() {
    let json = r#"[{"Plan": {
        "Node Type": 7,
        "Plan Rows": "many",
        "Actual Loops": null,
        "Total Cost": "12.5",
        "Plans": {"Node Type": "Sort"}
    }}]"#;

    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.node_type, "Unknown");
    assert_eq!(plan.root.rows_estimated, 0);
    assert_eq!(plan.root.loops, 1);
    assert_eq!(plan.root.total_cost, 0.0);
    assert!(plan.root.children.is_empty());
}

#[test]
fn test_extra_fields_are_ignored() {
    let json = r#"[{"Plan": {
        "Node Type": "Seq Scan",
        "Parallel Aware": false,
        "Plan Width": 36,
        "Output": ["id", "name"]
    }, "Triggers": []}]"#;

    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.node_type, "Seq Scan");
}

#[test]
fn test_fractional_row_counts_are_rounded() {
    let json = r#"[{"Plan": {"Node Type": "Index Scan", "Plan Rows": 3, "Actual Rows": 2.5, "Actual Loops": 4}}]"#;

    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.rows_actual, 3);
    assert_eq!(plan.root.loops, 4);
}

// ============================================================================
// Filter resolution
// ============================================================================

#[test]
fn test_filter_preferred_over_index_cond() {
    let json = r#"[{"Plan": {"Filter": "(a > 1)", "Index Cond": "(id = 1)"}}]"#;
    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.filter, "(a > 1)");
}

#[test]
fn test_index_cond_fallback() {
    let json = r#"[{"Plan": {"Node Type": "Index Scan", "Index Cond": "(id = 42)"}}]"#;
    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.filter, "(id = 42)");
}

#[test]
fn test_empty_filter_falls_back_to_index_cond() {
    let json = r#"[{"Plan": {"Filter": "", "Index Cond": "(id = 42)"}}]"#;
    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.root.filter, "(id = 42)");
}

// ============================================================================
// Tree shape
// ============================================================================

#[test]
fn test_node_count_matches_plan_objects() {
    let json = r#"[{"Plan": {
        "Node Type": "Limit",
        "Plans": [{
            "Node Type": "Nested Loop",
            "Plans": [
                {"Node Type": "Seq Scan", "Relation Name": "a"},
                {"Node Type": "Materialize", "Plans": [
                    {"Node Type": "Seq Scan", "Relation Name": "b"}
                ]}
            ]
        }]
    }}]"#;

    let plan = parse_explain_json(json).expect("parse failed");
    assert_eq!(plan.node_count(), json.matches("\"Node Type\"").count());
    assert_eq!(plan.root.depth(), 4);

    let order: Vec<_> = plan.iter_nodes().map(|n| n.node_type.as_str()).collect();
    assert_eq!(
        order,
        vec!["Limit", "Nested Loop", "Seq Scan", "Materialize", "Seq Scan"]
    );
}

/// `levels` nested loops, each with a single child, ending in a scan of `t`
fn nested_loop_chain(levels: usize) -> String {
    let mut json = String::from("[{\"Plan\": ");
    for _ in 0..levels {
        json.push_str(r#"{"Node Type": "Nested Loop", "Actual Total Time": 1.0, "Plans": ["#);
    }
    json.push_str(r#"{"Node Type": "Seq Scan", "Relation Name": "t", "Plan Rows": 1, "Actual Rows": 1, "Actual Total Time": 2.0}"#);
    for _ in 0..levels {
        json.push_str("]}");
    }
    json.push_str(", \"Execution Time\": 3.0}]");
    json
}

#[test]
fn test_deep_plan_chain() {
    // Far past serde_json's default nesting limit of 128
    let levels = 1_000;
    let plan = parse_explain_json(&nested_loop_chain(levels)).expect("parse failed");

    assert_eq!(plan.node_count(), levels + 1);
    assert_eq!(plan.root.depth(), levels + 1);
    assert_eq!(plan.execution_time, 3.0);

    let leaf = plan.iter_nodes().last().unwrap();
    assert_eq!(leaf.node_type, "Seq Scan");
    assert_eq!(leaf.relation, "t");
    assert!(leaf.is_leaf());
    assert_eq!(plan.find_nodes_by_type(NodeType::NestedLoop).len(), levels);
}

#[test]
fn test_deep_chain_still_rejects_bad_json() {
    let mut json = nested_loop_chain(300);
    json.truncate(json.len() - 10);

    assert!(matches!(parse_explain_json(&json), Err(ExplainError::Decode(_))));
}

#[test]
fn test_wide_fan_out() {
    let width = 1_000;
    let children: Vec<String> = (0..width)
        .map(|i| format!(r#"{{"Node Type": "Seq Scan", "Relation Name": "part_{i}"}}"#))
        .collect();
    let json = format!(
        r#"[{{"Plan": {{"Node Type": "Append", "Plans": [{}]}}}}]"#,
        children.join(",")
    );

    let plan = parse_explain_json(&json).expect("parse failed");
    assert_eq!(plan.node_count(), width + 1);
    assert_eq!(plan.root.depth(), 2);
    assert_eq!(plan.root.children.len(), width);

    let relations: Vec<_> = plan.iter_nodes().skip(1).map(|n| n.relation.clone()).collect();
    let expected: Vec<_> = (0..width).map(|i| format!("part_{i}")).collect();
    assert_eq!(relations, expected);
}

#[test]
fn test_parse_value_directly() {
    let value = serde_json::json!([{
        "Plan": {"Node Type": "Aggregate", "Plans": [{"Node Type": "Seq Scan"}]},
        "Execution Time": 3.25
    }]);

    let plan = parse_explain_value(&value).expect("parse failed");
    assert_eq!(plan.root.node_type, "Aggregate");
    assert_eq!(plan.root.children[0].node_type, "Seq Scan");
    assert_eq!(plan.execution_time, 3.25);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_invalid_json_is_decode_error() {
    let err = parse_explain_json("[{\"Plan\": ").unwrap_err();
    assert!(matches!(err, ExplainError::Decode(_)));
    assert!(err.to_string().starts_with("Invalid JSON"));
}

#[test]
fn test_empty_array_is_shape_error() {
    let err = parse_explain_json("[]").unwrap_err();
    assert!(matches!(err, ExplainError::Shape(_)));
}

#[test]
fn test_primitive_root_is_shape_error() {
    for input in ["42", "\"plan\"", "null", "true", "[1]", "[[]]"] {
        let err = parse_explain_json(input).unwrap_err();
        assert!(
            matches!(err, ExplainError::Shape(_)),
            "expected shape error for {input}, got {err:?}"
        );
    }
}

#[test]
fn test_non_object_plan_is_shape_error() {
    let err = parse_explain_json(r#"[{"Plan": "Seq Scan"}]"#).unwrap_err();
    assert!(matches!(err, ExplainError::Shape(ref msg) if msg.contains("a string")));
}

#[test]
fn test_non_object_child_is_shape_error() {
    let err = parse_explain_json(r#"[{"Plan": {"Node Type": "Append", "Plans": [1]}}]"#)
        .unwrap_err();
    assert!(matches!(err, ExplainError::Shape(_)));
}
