use common::schema::TableRef;

use crate::expr::{AggregateExpr, Expr, OrderItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    Select,
}

/// A logical query-plan node, per the relational-algebra sum the data
/// model defines. Nodes are immutable; rewrites build a new tree rather
/// than mutating one in place, so the rule engine can tell whether a
/// pass changed anything.
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    DataSource {
        table: String,
        schema: TableRef,
        output_columns: Option<Vec<String>>,
        pushed_predicates: Vec<Expr>,
        pushed_limit: Option<(usize, usize)>,
    },
    Selection {
        predicates: Vec<Expr>,
        child: Box<LogicalPlan>,
    },
    Projection {
        expressions: Vec<Expr>,
        child: Box<LogicalPlan>,
    },
    Sort {
        order: Vec<OrderItem>,
        child: Box<LogicalPlan>,
    },
    Limit {
        limit: usize,
        offset: usize,
        child: Box<LogicalPlan>,
    },
    Join {
        kind: JoinKind,
        conditions: Vec<Expr>,
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
    },
    /// The semi-join-rewrite target: emits each left row at most once
    /// whenever a matching right row exists (or, when `negated`, exactly
    /// when none does — an anti-join), without materializing right-side
    /// columns. Produced only by the semi-join rewrite rule, never by
    /// the AST-to-logical-plan translation directly.
    SemiJoin {
        negated: bool,
        conditions: Vec<Expr>,
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
    },
    Aggregate {
        aggregates: Vec<AggregateExpr>,
        group_by: Vec<Expr>,
        child: Box<LogicalPlan>,
    },
    Union {
        kind: UnionKind,
        all: bool,
        children: Vec<LogicalPlan>,
    },
    /// A statically-known-empty result with a fixed output schema,
    /// produced by constant folding when a predicate above a
    /// non-`DataSource` subtree (a `Join`, `Aggregate`, `Sort`, ...)
    /// folds to `false`: there is no table to attach the zero rows to,
    /// so this node carries the column names directly instead of
    /// borrowing an unregistered table name.
    Empty {
        columns: Vec<String>,
    },
}

impl LogicalPlan {
    pub fn data_source(table: impl Into<String>, schema: TableRef) -> Self {
        LogicalPlan::DataSource { table: table.into(), schema, output_columns: None, pushed_predicates: Vec::new(), pushed_limit: None }
    }

    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::DataSource { .. } | LogicalPlan::Empty { .. } => Vec::new(),
            LogicalPlan::Selection { child, .. }
            | LogicalPlan::Projection { child, .. }
            | LogicalPlan::Sort { child, .. }
            | LogicalPlan::Limit { child, .. }
            | LogicalPlan::Aggregate { child, .. } => vec![child],
            LogicalPlan::Join { left, right, .. } | LogicalPlan::SemiJoin { left, right, .. } => vec![left, right],
            LogicalPlan::Union { children, .. } => children.iter().collect(),
        }
    }

    /// The output column names this node produces, derived from its
    /// inputs (never stored redundantly, per the "deterministic from
    /// inputs" invariant).
    pub fn output_schema(&self) -> Vec<String> {
        match self {
            LogicalPlan::DataSource { schema, output_columns, .. } => {
                output_columns.clone().unwrap_or_else(|| schema.column_names())
            }
            LogicalPlan::Selection { child, .. } => child.output_schema(),
            LogicalPlan::Projection { expressions, .. } => expressions.iter().map(Expr::output_name).collect(),
            LogicalPlan::Sort { child, .. } | LogicalPlan::Limit { child, .. } => child.output_schema(),
            LogicalPlan::Join { left, right, .. } => {
                let mut names = left.output_schema();
                let right_names = right.output_schema();
                for name in right_names {
                    if names.contains(&name) {
                        names.push(format!("right_{name}"));
                    } else {
                        names.push(name);
                    }
                }
                names
            }
            LogicalPlan::Aggregate { aggregates, group_by, .. } => {
                let mut names: Vec<String> = group_by.iter().map(Expr::output_name).collect();
                names.extend(aggregates.iter().map(|a| a.output_name.clone()));
                names
            }
            LogicalPlan::SemiJoin { left, .. } => left.output_schema(),
            LogicalPlan::Union { children, .. } => children.first().map(|c| c.output_schema()).unwrap_or_default(),
            LogicalPlan::Empty { columns } => columns.clone(),
        }
    }

    pub fn estimated_row_count(&self, stats: &crate::stats::StatsProvider) -> f64 {
        crate::stats::estimate_cardinality(self, stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::Table;
    use common::value::ColumnType;

    use super::*;

    fn sample_table() -> TableRef {
        Arc::new(Table::new("t", vec![common::schema::Column::new("id", ColumnType::Int)]).unwrap())
    }

    #[test]
    fn data_source_output_schema_follows_table_columns() {
        let plan = LogicalPlan::data_source("t", sample_table());
        assert_eq!(plan.output_schema(), vec!["id".to_string()]);
    }

    #[test]
    fn join_prefixes_colliding_right_column_names() {
        let left = LogicalPlan::data_source("t", sample_table());
        let right = LogicalPlan::data_source("t", sample_table());
        let plan = LogicalPlan::Join { kind: JoinKind::Inner, conditions: Vec::new(), left: Box::new(left), right: Box::new(right) };
        assert_eq!(plan.output_schema(), vec!["id".to_string(), "right_id".to_string()]);
    }
}
