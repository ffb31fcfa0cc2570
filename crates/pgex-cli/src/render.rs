//! Plan output: an annotated text tree, or a JSON report

use crate::config::RenderConfig;
use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use pgex_analyzer::{PlanAnalysis, PlanNode, QueryPlan, Suggestion};
use serde::Serialize;

const SLOWEST_MARKER: &str = "⚠ SLOWEST";

/// Renders timings, the plan tree and the summary panel
pub fn render_text(plan: &QueryPlan, analysis: &PlanAnalysis<'_>, config: &RenderConfig) -> String {
    let mut lines = vec![
        format!("Planning Time: {:.2}ms", plan.planning_time),
        format!("Execution Time: {:.2}ms", plan.execution_time),
        String::new(),
    ];

    let tree = TreeRenderer {
        analysis,
        config,
        total_time: plan.execution_time,
    };
    tree.render_tree(&plan.root, &mut lines);

    lines.push(String::new());
    lines.push(render_summary(analysis));
    lines.join("\n")
}

struct TreeRenderer<'a> {
    analysis: &'a PlanAnalysis<'a>,
    config: &'a RenderConfig,
    total_time: f64,
}

impl TreeRenderer<'_> {
    /// Walks the tree with an explicit stack; `last_sibling` is `None` for the root
    fn render_tree(&self, root: &PlanNode, lines: &mut Vec<String>) {
        let mut pending = vec![(root, String::new(), None)];

        while let Some((node, prefix, last_sibling)) = pending.pop() {
            let (connector, child_prefix) = match last_sibling {
                None => ("", prefix.clone()),
                Some(false) => ("├── ", format!("{prefix}│   ")),
                Some(true) => ("└── ", format!("{prefix}    ")),
            };

            let mut header = node_header(node);
            if self.analysis.is_slowest(node) {
                header.push(' ');
                header.push_str(SLOWEST_MARKER);
            }
            lines.push(format!("{prefix}{connector}{header}"));

            // Keep the guide line running down to the children
            let detail_prefix = if node.is_leaf() {
                format!("{child_prefix}  ")
            } else {
                format!("{child_prefix}│ ")
            };
            lines.push(format!("{detail_prefix}{}", self.node_details(node)));
            if self.config.show_filters && !node.filter.is_empty() {
                lines.push(format!("{detail_prefix}Filter: {}", node.filter));
            }

            // Reversed so the first child is rendered next
            let count = node.children.len();
            for (i, child) in node.children.iter().enumerate().rev() {
                pending.push((child, child_prefix.clone(), Some(i + 1 == count)));
            }
        }
    }

    fn node_details(&self, node: &PlanNode) -> String {
        let mut parts = vec![
            format!("Cost: {:.2}..{:.2}", node.startup_cost, node.total_cost),
            rows_summary(node),
        ];
        if let Some(time) = self.time_share(node) {
            parts.push(time);
        }
        parts.join("  ")
    }

    /// Share of total execution time; omitted when the report has no timing
    fn time_share(&self, node: &PlanNode) -> Option<String> {
        if self.total_time <= 0.0 {
            return None;
        }

        let pct = node.actual_time / self.total_time * 100.0;
        let width = self.config.bar_width;
        let filled = ((pct * width as f64 / 100.0).floor().max(0.0) as usize).min(width);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(width - filled));

        Some(format!("Time: {:.1}ms [{bar}] ({pct:.0}%)", node.actual_time))
    }
}

/// `Seq Scan on orders`, `Index Scan on users using users_pkey`
pub fn node_header(node: &PlanNode) -> String {
    let mut header = node.node_type.clone();
    if !node.relation.is_empty() {
        header.push_str(" on ");
        header.push_str(&node.relation);
    }
    if !node.index_name.is_empty() {
        header.push_str(" using ");
        header.push_str(&node.index_name);
    }
    header
}

fn rows_summary(node: &PlanNode) -> String {
    if node.rows_actual == node.rows_estimated {
        return format!("Rows: {}", node.rows_actual);
    }

    let marker = if rows_diverge(node) { " (!)" } else { "" };
    format!("Rows: {} → {}{marker}", node.rows_estimated, node.rows_actual)
}

/// Actual rows differ from the estimate by more than half the estimate
fn rows_diverge(node: &PlanNode) -> bool {
    node.rows_actual.abs_diff(node.rows_estimated) as f64 > node.rows_estimated as f64 * 0.5
}

fn render_summary(analysis: &PlanAnalysis<'_>) -> String {
    let mut body = vec![format!(
        "Slowest Node: {} ({:.1}ms)",
        analysis.slowest.node_type, analysis.slowest.actual_time
    )];
    if !analysis.is_clean() {
        body.push(String::new());
        body.push("Suggestions:".to_string());
        body.extend(analysis.suggestions.iter().map(|s| format!("  - {s}")));
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Summary"])
        .add_row(vec![body.join("\n")]);
    table.to_string()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    planning_time: f64,
    execution_time: f64,
    slowest: SlowestNode<'a>,
    suggestions: &'a [Suggestion],
    plan: &'a PlanNode,
}

#[derive(Serialize)]
struct SlowestNode<'a> {
    /// Pre-order position in `plan`
    index: usize,
    node_type: &'a str,
    relation: &'a str,
    actual_time: f64,
}

/// Renders the plan and its analysis as pretty-printed JSON
pub fn render_json(plan: &QueryPlan, analysis: &PlanAnalysis<'_>) -> Result<String> {
    let report = JsonReport {
        planning_time: plan.planning_time,
        execution_time: plan.execution_time,
        slowest: SlowestNode {
            index: analysis.slowest_index,
            node_type: &analysis.slowest.node_type,
            relation: &analysis.slowest.relation,
            actual_time: analysis.slowest.actual_time,
        },
        suggestions: &analysis.suggestions,
        plan: &plan.root,
    };
    serde_json::to_string_pretty(&report).context("Failed to serialize report")
}
