//! Query Plan Model - Data structures for EXPLAIN ANALYZE plan trees
//!
//! A [`QueryPlan`] owns a single root [`PlanNode`]; every node owns its
//! children by value, so the tree is finite and acyclic by construction.
//! Plans are built once by the parser and only read afterwards.

use serde::Serialize;

/// Represents a complete EXPLAIN ANALYZE report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryPlan {
    /// Planning time in milliseconds (0 when the report omits it)
    pub planning_time: f64,
    /// Execution time in milliseconds (0 when the report omits it)
    pub execution_time: f64,
    /// Root node of the plan tree
    pub root: PlanNode,
}

impl QueryPlan {
    /// Creates a new query plan with the given root node and zero timings
    pub fn new(root: PlanNode) -> Self {
        Self {
            planning_time: 0.0,
            execution_time: 0.0,
            root,
        }
    }

    /// Sets the planning time
    pub fn with_planning_time(mut self, ms: f64) -> Self {
        self.planning_time = ms;
        self
    }

    /// Sets the execution time
    pub fn with_execution_time(mut self, ms: f64) -> Self {
        self.execution_time = ms;
        self
    }

    /// Returns an iterator over all nodes in the plan (pre-order)
    pub fn iter_nodes(&self) -> PlanNodeIterator<'_> {
        self.root.iter()
    }

    /// Total number of operators in the plan
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Finds all nodes of a specific operator kind, in plan order
    pub fn find_nodes_by_type(&self, node_type: NodeType) -> Vec<&PlanNode> {
        self.iter_nodes().filter(|n| n.kind() == node_type).collect()
    }

    /// Returns true if the plan contains any sequential scans
    pub fn has_sequential_scans(&self) -> bool {
        self.iter_nodes().any(|n| n.kind() == NodeType::SeqScan)
    }
}

/// A single operator in the plan tree
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanNode {
    /// Operator name exactly as reported, e.g. "Seq Scan"
    pub node_type: String,
    /// Relation/table name, empty for non-scan operators
    pub relation: String,
    /// Alias used in the query, may be empty
    pub alias: String,
    /// Planner estimate to return the first row
    pub startup_cost: f64,
    /// Planner estimate to return all rows
    pub total_cost: f64,
    /// Planner row estimate
    pub rows_estimated: u64,
    /// Rows actually produced
    pub rows_actual: u64,
    /// Actual time in milliseconds, cumulative across loops
    pub actual_time: f64,
    /// Number of times the operator was executed
    pub loops: u64,
    /// Filter condition, falling back to the index condition
    pub filter: String,
    /// Index used by the operator, empty if none
    pub index_name: String,
    /// Child operators in plan order
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Creates a node carrying the documented defaults for every statistic
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            relation: String::new(),
            alias: String::new(),
            startup_cost: 0.0,
            total_cost: 0.0,
            rows_estimated: 0,
            rows_actual: 0,
            actual_time: 0.0,
            loops: 1,
            filter: String::new(),
            index_name: String::new(),
            children: Vec::new(),
        }
    }

    /// Sets the relation/table name
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }

    /// Sets the alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Sets the planner cost estimates
    pub fn with_cost(mut self, startup: f64, total: f64) -> Self {
        self.startup_cost = startup;
        self.total_cost = total;
        self
    }

    /// Sets the estimated and actual row counts
    pub fn with_rows(mut self, estimated: u64, actual: u64) -> Self {
        self.rows_estimated = estimated;
        self.rows_actual = actual;
        self
    }

    /// Sets the actual total time in milliseconds
    pub fn with_actual_time(mut self, ms: f64) -> Self {
        self.actual_time = ms;
        self
    }

    /// Sets the loop count
    pub fn with_loops(mut self, loops: u64) -> Self {
        self.loops = loops;
        self
    }

    /// Sets the filter condition
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Sets the index name
    pub fn with_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    /// Adds a child node
    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    /// Classifies the operator name
    pub fn kind(&self) -> NodeType {
        NodeType::from_postgres_str(&self.node_type)
    }

    /// Relation name if present, otherwise the operator name
    pub fn label(&self) -> &str {
        if self.relation.is_empty() {
            &self.node_type
        } else {
            &self.relation
        }
    }

    /// Ratio of actual to estimated rows, `None` when the planner estimated zero
    pub fn row_estimate_ratio(&self) -> Option<f64> {
        (self.rows_estimated > 0).then(|| self.rows_actual as f64 / self.rows_estimated as f64)
    }

    /// True when `other` is this very node, not merely an equal one
    pub fn same_node(&self, other: &PlanNode) -> bool {
        std::ptr::eq(self, other)
    }

    /// Pre-order iterator over this node and all of its descendants
    pub fn iter(&self) -> PlanNodeIterator<'_> {
        PlanNodeIterator::new(self)
    }

    /// Pre-order position of `node` within this subtree, by identity
    pub fn position_of(&self, node: &PlanNode) -> Option<usize> {
        self.iter().position(|n| n.same_node(node))
    }

    /// Returns the total number of nodes in this subtree (including self)
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Returns the maximum depth of this subtree
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// Returns true if this is a leaf node (no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns true if this node reads a relation
    pub fn is_scan(&self) -> bool {
        self.kind().is_scan()
    }

    /// Returns true if this node joins two inputs
    pub fn is_join(&self) -> bool {
        self.kind().is_join()
    }
}

/// Known PostgreSQL operator kinds
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    SeqScan,
    IndexScan,
    IndexOnlyScan,
    BitmapIndexScan,
    BitmapHeapScan,
    TidScan,
    SubqueryScan,
    FunctionScan,
    ValuesScan,
    CteScan,
    ForeignScan,
    NestedLoop,
    HashJoin,
    MergeJoin,
    Aggregate,
    WindowAgg,
    Sort,
    IncrementalSort,
    Append,
    MergeAppend,
    Limit,
    Materialize,
    Memoize,
    Hash,
    Unique,
    Gather,
    GatherMerge,
    ModifyTable,
    Result,
    Unknown,
}

impl NodeType {
    /// Maps a JSON "Node Type" value; anything unrecognized is `Unknown`
    pub fn from_postgres_str(s: &str) -> Self {
        match s {
            "Seq Scan" => Self::SeqScan,
            "Index Scan" => Self::IndexScan,
            "Index Only Scan" => Self::IndexOnlyScan,
            "Bitmap Index Scan" => Self::BitmapIndexScan,
            "Bitmap Heap Scan" => Self::BitmapHeapScan,
            "Tid Scan" | "TID Scan" => Self::TidScan,
            "Subquery Scan" => Self::SubqueryScan,
            "Function Scan" => Self::FunctionScan,
            "Values Scan" => Self::ValuesScan,
            "CTE Scan" => Self::CteScan,
            "Foreign Scan" => Self::ForeignScan,
            "Nested Loop" => Self::NestedLoop,
            "Hash Join" => Self::HashJoin,
            "Merge Join" => Self::MergeJoin,
            "Aggregate" => Self::Aggregate,
            "WindowAgg" => Self::WindowAgg,
            "Sort" => Self::Sort,
            "Incremental Sort" => Self::IncrementalSort,
            "Append" => Self::Append,
            "Merge Append" => Self::MergeAppend,
            "Limit" => Self::Limit,
            "Materialize" => Self::Materialize,
            "Memoize" => Self::Memoize,
            "Hash" => Self::Hash,
            "Unique" => Self::Unique,
            "Gather" => Self::Gather,
            "Gather Merge" => Self::GatherMerge,
            "ModifyTable" => Self::ModifyTable,
            "Result" => Self::Result,
            _ => Self::Unknown,
        }
    }

    pub fn is_scan(&self) -> bool {
        matches!(
            self,
            Self::SeqScan
                | Self::IndexScan
                | Self::IndexOnlyScan
                | Self::BitmapIndexScan
                | Self::BitmapHeapScan
                | Self::TidScan
                | Self::SubqueryScan
                | Self::FunctionScan
                | Self::ValuesScan
                | Self::CteScan
                | Self::ForeignScan
        )
    }

    pub fn is_join(&self) -> bool {
        matches!(self, Self::NestedLoop | Self::HashJoin | Self::MergeJoin)
    }
}

/// Iterator for traversing plan nodes in pre-order
pub struct PlanNodeIterator<'a> {
    stack: Vec<&'a PlanNode>,
}

impl<'a> PlanNodeIterator<'a> {
    fn new(root: &'a PlanNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for PlanNodeIterator<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reversed so the first child is popped next
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
