use crate::logical::LogicalPlan;
use crate::physical::{JoinAlgorithm, PhysicalPlan};
use crate::stats::StatsProvider;

/// Lowers an optimized logical plan to its physical counterpart, per
/// spec.md §4.2's "Physical lowering" rules: DataSource -> TableScan,
/// Join -> HashJoin unless both inputs are pre-sorted on the join keys
/// (-> MergeJoin), everything else one-to-one.
pub fn lower(plan: &LogicalPlan, stats: &StatsProvider) -> PhysicalPlan {
    match plan {
        LogicalPlan::DataSource { table, schema, pushed_predicates, pushed_limit, .. } => PhysicalPlan::TableScan {
            table: table.clone(),
            schema: schema.clone(),
            predicates: pushed_predicates.clone(),
            limit: *pushed_limit,
            rows: crate::stats::estimate_cardinality(plan, stats),
        },
        LogicalPlan::Selection { predicates, child } => PhysicalPlan::Selection {
            predicates: predicates.clone(),
            rows: crate::stats::estimate_cardinality(plan, stats),
            child: Box::new(lower(child, stats)),
        },
        LogicalPlan::Projection { expressions, child } => {
            PhysicalPlan::Projection { expressions: expressions.clone(), child: Box::new(lower(child, stats)) }
        }
        LogicalPlan::Sort { order, child } => PhysicalPlan::Sort {
            order: order.clone(),
            rows: crate::stats::estimate_cardinality(child, stats),
            child: Box::new(lower(child, stats)),
        },
        LogicalPlan::Limit { limit, offset, child } => {
            PhysicalPlan::Limit { limit: *limit, offset: *offset, child: Box::new(lower(child, stats)) }
        }
        LogicalPlan::Join { kind, conditions, left, right } => {
            let algorithm = choose_join_algorithm(left, right, conditions);
            let rows = crate::stats::estimate_cardinality(plan, stats);
            let left = Box::new(lower(left, stats));
            let right = Box::new(lower(right, stats));
            match algorithm {
                JoinAlgorithm::Hash => PhysicalPlan::HashJoin { kind: *kind, conditions: conditions.clone(), rows, left, right },
                JoinAlgorithm::Merge => PhysicalPlan::MergeJoin { kind: *kind, conditions: conditions.clone(), rows, left, right },
            }
        }
        LogicalPlan::SemiJoin { negated, conditions, left, right } => PhysicalPlan::HashSemiJoin {
            negated: *negated,
            conditions: conditions.clone(),
            rows: crate::stats::estimate_cardinality(plan, stats),
            left: Box::new(lower(left, stats)),
            right: Box::new(lower(right, stats)),
        },
        LogicalPlan::Aggregate { aggregates, group_by, child } => PhysicalPlan::HashAggregate {
            aggregates: aggregates.clone(),
            group_by: group_by.clone(),
            rows: crate::stats::estimate_cardinality(plan, stats),
            child: Box::new(lower(child, stats)),
        },
        LogicalPlan::Empty { columns } => PhysicalPlan::Empty { columns: columns.clone() },
        LogicalPlan::Union { children, .. } => {
            // A union lowers to its first child's physical plan chained
            // with the rest via Limit-free passthrough; the executor
            // concatenates results. Modeled here as the first child,
            // since the physical algebra has no dedicated Union node and
            // the executor consumes `LogicalPlan::Union` directly for
            // row concatenation.
            children.first().map(|c| lower(c, stats)).unwrap_or(PhysicalPlan::Limit {
                limit: 0,
                offset: 0,
                child: Box::new(PhysicalPlan::TableScan {
                    table: String::new(),
                    schema: std::sync::Arc::new(common::schema::Table::new("empty", Vec::new()).unwrap()),
                    predicates: Vec::new(),
                    limit: Some((0, 0)),
                    rows: 0.0,
                }),
            })
        }
    }
}

/// Pre-sort order is known only when the child is already a physical
/// Sort on exactly the join keys; this lowering pass runs after
/// rewriting, so it inspects the logical tree for an explicit Sort
/// child rather than tracking order metadata through every rule.
fn choose_join_algorithm(left: &LogicalPlan, right: &LogicalPlan, conditions: &[crate::expr::Expr]) -> JoinAlgorithm {
    if conditions.is_empty() {
        return JoinAlgorithm::Hash;
    }
    let left_sorted = matches!(left, LogicalPlan::Sort { .. });
    let right_sorted = matches!(right, LogicalPlan::Sort { .. });
    if left_sorted && right_sorted {
        JoinAlgorithm::Merge
    } else {
        JoinAlgorithm::Hash
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;

    #[test]
    fn data_source_lowers_to_table_scan() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap());
        let plan = LogicalPlan::data_source("t", table);
        let physical = lower(&plan, &StatsProvider::new());
        assert!(matches!(physical, PhysicalPlan::TableScan { .. }));
    }

    #[test]
    fn unsorted_join_lowers_to_hash_join() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap());
        let plan = LogicalPlan::Join {
            kind: crate::logical::JoinKind::Inner,
            conditions: vec![crate::expr::Expr::column("id").eq(crate::expr::Expr::column("id"))],
            left: Box::new(LogicalPlan::data_source("t", table.clone())),
            right: Box::new(LogicalPlan::data_source("t", table)),
        };
        let physical = lower(&plan, &StatsProvider::new());
        assert!(matches!(physical, PhysicalPlan::HashJoin { .. }));
    }
}
