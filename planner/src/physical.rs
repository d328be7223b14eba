use common::schema::TableRef;

use crate::expr::{AggregateExpr, Expr, OrderItem};
use crate::logical::JoinKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAlgorithm {
    Hash,
    Merge,
}

/// The physical counterpart of [`crate::logical::LogicalPlan`]: the same
/// algebra plus an algorithm choice where more than one exists. Every
/// node carries the row estimate it was lowered with; `cost` recomputes
/// the estimated cost on demand via [`crate::cost::estimate_cost`]
/// rather than storing it, so a plan can be re-costed against fresh
/// statistics without rebuilding the tree.
#[derive(Debug, Clone)]
pub enum PhysicalPlan {
    TableScan {
        table: String,
        schema: TableRef,
        predicates: Vec<Expr>,
        limit: Option<(usize, usize)>,
        rows: f64,
    },
    Selection {
        predicates: Vec<Expr>,
        rows: f64,
        child: Box<PhysicalPlan>,
    },
    Projection {
        expressions: Vec<Expr>,
        child: Box<PhysicalPlan>,
    },
    Sort {
        order: Vec<OrderItem>,
        rows: f64,
        child: Box<PhysicalPlan>,
    },
    Limit {
        limit: usize,
        offset: usize,
        child: Box<PhysicalPlan>,
    },
    HashJoin {
        kind: JoinKind,
        conditions: Vec<Expr>,
        rows: f64,
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
    },
    MergeJoin {
        kind: JoinKind,
        conditions: Vec<Expr>,
        rows: f64,
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
    },
    HashSemiJoin {
        negated: bool,
        conditions: Vec<Expr>,
        rows: f64,
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
    },
    HashAggregate {
        aggregates: Vec<AggregateExpr>,
        group_by: Vec<Expr>,
        rows: f64,
        child: Box<PhysicalPlan>,
    },
    Window {
        partition_by: Vec<Expr>,
        order: Vec<OrderItem>,
        functions: Vec<WindowFunction>,
        child: Box<PhysicalPlan>,
    },
    /// The physical counterpart of [`crate::logical::LogicalPlan::Empty`]:
    /// produces zero rows directly, with no backend lookup involved.
    Empty {
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowFunction {
    RowNumber { output_name: String },
    Rank { output_name: String },
    DenseRank { output_name: String },
    Lag { arg: Expr, offset: i64, output_name: String },
    Lead { arg: Expr, offset: i64, output_name: String },
    Aggregate { expr: AggregateExpr, frame: WindowFrame },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFrame {
    pub start: FrameBound,
    pub end: FrameBound,
}

impl PhysicalPlan {
    pub fn row_estimate(&self) -> f64 {
        match self {
            PhysicalPlan::TableScan { rows, .. }
            | PhysicalPlan::Selection { rows, .. }
            | PhysicalPlan::Sort { rows, .. }
            | PhysicalPlan::HashJoin { rows, .. }
            | PhysicalPlan::MergeJoin { rows, .. }
            | PhysicalPlan::HashSemiJoin { rows, .. }
            | PhysicalPlan::HashAggregate { rows, .. } => *rows,
            PhysicalPlan::Projection { child, .. } | PhysicalPlan::Window { child, .. } => child.row_estimate(),
            PhysicalPlan::Limit { limit, child, .. } => child.row_estimate().min(*limit as f64),
            PhysicalPlan::Empty { .. } => 0.0,
        }
    }

    pub fn cost(&self, stats: &crate::stats::StatsProvider) -> f64 {
        crate::cost::estimate_cost(self, stats)
    }
}
