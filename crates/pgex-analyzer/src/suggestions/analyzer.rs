//! Query Analyzer - Slowest node search and optimization suggestions
//!
//! Both operations walk the plan in pre-order, so results are stable for a
//! given tree: the slowest node is the first one reaching the maximum time,
//! and suggestions come out in plan order, one line per matched rule.

use crate::explain::{NodeType, PlanNode, QueryPlan};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of optimization suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Sequential scan producing many rows
    MissingIndex,
    /// Planner row estimate far from the actual row count
    OutdatedStatistics,
}

impl SuggestionKind {
    /// Returns a human-readable description of this suggestion kind
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingIndex => "Sequential scan over many rows",
            Self::OutdatedStatistics => "Row estimate diverges from actual rows",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingIndex => "missing_index",
            Self::OutdatedStatistics => "outdated_statistics",
        }
    }
}

/// A single optimization suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Which rule produced this suggestion
    pub kind: SuggestionKind,
    /// Relation (or operator name) the suggestion is about
    pub target: String,
    /// Fully formatted message, ready to print
    pub message: String,
}

impl Suggestion {
    /// Suggests an index on a sequentially scanned relation
    pub fn missing_index(relation: impl Into<String>) -> Self {
        let target = relation.into();
        Self {
            kind: SuggestionKind::MissingIndex,
            message: format!("Consider adding index on {target}"),
            target,
        }
    }

    /// Suggests refreshing statistics for a relation or operator
    pub fn outdated_statistics(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            kind: SuggestionKind::OutdatedStatistics,
            message: format!("Statistics may be outdated for {target}"),
            target,
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of analyzing a whole plan
#[derive(Debug, Clone)]
pub struct PlanAnalysis<'a> {
    /// The node with the greatest actual time
    pub slowest: &'a PlanNode,
    /// Pre-order position of `slowest` in the plan
    pub slowest_index: usize,
    /// Suggestions in plan order
    pub suggestions: Vec<Suggestion>,
}

impl PlanAnalysis<'_> {
    /// True when `node` is the slowest node itself (identity, not equality)
    pub fn is_slowest(&self, node: &PlanNode) -> bool {
        self.slowest.same_node(node)
    }

    /// Suggestion messages, in order
    pub fn messages(&self) -> Vec<&str> {
        self.suggestions.iter().map(|s| s.message.as_str()).collect()
    }

    /// Returns true if no rule matched
    pub fn is_clean(&self) -> bool {
        self.suggestions.is_empty()
    }
}

/// Thresholds used by the suggestion rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// A sequential scan returning more rows than this suggests an index
    pub seq_scan_row_threshold: u64,
    /// Actual/estimated ratios above this, or below its reciprocal, flag statistics
    pub skew_ratio_threshold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            seq_scan_row_threshold: 1_000,
            skew_ratio_threshold: 10.0,
        }
    }
}

impl AnalyzerConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sequential scan row threshold
    pub fn with_seq_scan_row_threshold(mut self, threshold: u64) -> Self {
        self.seq_scan_row_threshold = threshold;
        self
    }

    /// Sets the skew ratio threshold (values below 1.0 are treated as 1.0)
    pub fn with_skew_ratio_threshold(mut self, threshold: f64) -> Self {
        self.skew_ratio_threshold = threshold;
        self
    }

    fn skew_bounds(&self) -> (f64, f64) {
        let high = self.skew_ratio_threshold.max(1.0);
        (1.0 / high, high)
    }
}

/// Query analyzer that finds the slowest node and produces suggestions
#[derive(Debug, Clone, Default)]
pub struct QueryAnalyzer {
    config: AnalyzerConfig,
}

impl QueryAnalyzer {
    /// Creates a new analyzer with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new analyzer with custom config
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Returns the analyzer config
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Runs the slowest-node search and all suggestion rules
    pub fn analyze<'a>(&self, plan: &'a QueryPlan) -> PlanAnalysis<'a> {
        let (slowest_index, slowest) = find_slowest_with_index(&plan.root);
        let suggestions = self.suggestions(&plan.root);

        tracing::debug!(
            slowest = %slowest.node_type,
            slowest_index,
            slowest_ms = slowest.actual_time,
            suggestions = suggestions.len(),
            "Analyzed plan"
        );

        PlanAnalysis {
            slowest,
            slowest_index,
            suggestions,
        }
    }

    /// Applies every rule to every node, in pre-order
    pub fn suggestions(&self, root: &PlanNode) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();
        for node in root.iter() {
            self.check_sequential_scan(node, &mut suggestions);
            self.check_estimate_skew(node, &mut suggestions);
        }
        suggestions
    }

    fn check_sequential_scan(&self, node: &PlanNode, out: &mut Vec<Suggestion>) {
        if node.kind() == NodeType::SeqScan
            && node.rows_actual > self.config.seq_scan_row_threshold
        {
            tracing::trace!(
                relation = %node.relation,
                rows = node.rows_actual,
                "Sequential scan over threshold"
            );
            out.push(Suggestion::missing_index(&node.relation));
        }
    }

    fn check_estimate_skew(&self, node: &PlanNode, out: &mut Vec<Suggestion>) {
        // No estimate means no ratio; such nodes are never flagged
        let Some(ratio) = node.row_estimate_ratio() else {
            return;
        };

        let (low, high) = self.config.skew_bounds();
        if ratio > high || ratio < low {
            tracing::trace!(
                node = %node.label(),
                estimated = node.rows_estimated,
                actual = node.rows_actual,
                ratio,
                "Row estimate skew"
            );
            out.push(Suggestion::outdated_statistics(node.label()));
        }
    }
}

/// Finds the node with the greatest actual time
///
/// Every node is visited once in pre-order and only a strictly greater time
/// replaces the current pick, so the root wins when nothing beats it and the
/// first node wins among equals. Compare the result with
/// [`PlanNode::same_node`] to tell it apart from equal-valued nodes.
pub fn find_slowest_node(root: &PlanNode) -> &PlanNode {
    find_slowest_with_index(root).1
}

/// Like [`find_slowest_node`], also returning the node's pre-order position
pub fn find_slowest_with_index(root: &PlanNode) -> (usize, &PlanNode) {
    let mut slowest = (0, root);
    for (index, node) in root.iter().enumerate() {
        if node.actual_time > slowest.1.actual_time {
            slowest = (index, node);
        }
    }
    slowest
}

/// Suggestion messages for a plan tree using the default thresholds
pub fn generate_suggestions(root: &PlanNode) -> Vec<String> {
    QueryAnalyzer::new()
        .suggestions(root)
        .into_iter()
        .map(|s| s.message)
        .collect()
}
