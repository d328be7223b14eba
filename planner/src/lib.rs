pub mod cost;
pub mod expr;
pub mod logical;
pub mod lowering;
pub mod physical;
pub mod rules;
pub mod stats;

pub use expr::{AggregateExpr, AggregateFunction, BinaryOperator, Expr, OrderItem};
pub use logical::{JoinKind, LogicalPlan, UnionKind};
pub use physical::{FrameBound, JoinAlgorithm, PhysicalPlan, WindowFrame, WindowFunction};
pub use stats::StatsProvider;

/// A rewrite pass that never reaches a fixed point after this many
/// iterations is stopped and the tree is used as-is; this is not an
/// error, just a bound on how long planning can take.
const MAX_REWRITE_ITERATIONS: usize = 10;

/// Runs every rule in [`rules::rule_set`] over the whole tree,
/// repeating the full set until a pass leaves the tree unchanged or
/// [`MAX_REWRITE_ITERATIONS`] passes have run.
pub fn optimize(mut plan: LogicalPlan, stats: &StatsProvider) -> LogicalPlan {
    let rule_set = rules::rule_set();
    for pass in 0..MAX_REWRITE_ITERATIONS {
        let mut pass_changed = false;
        for rule in &rule_set {
            let (next, changed) = rules::apply_recursively(rule.as_ref(), plan, stats);
            if changed {
                tracing::debug!(rule = rule.name(), pass, "rewrite rule changed the plan");
            }
            plan = next;
            pass_changed |= changed;
        }
        if !pass_changed {
            break;
        }
        if pass == MAX_REWRITE_ITERATIONS - 1 {
            tracing::debug!(pass, "rewrite engine reached its iteration cap without a fixed point");
        }
    }
    plan
}

/// Optimizes a logical plan and lowers it to a physical plan ready for
/// the executor, re-estimating cardinalities against the final,
/// rewritten tree rather than the pre-optimization one.
pub fn plan(logical: LogicalPlan, stats: &StatsProvider) -> PhysicalPlan {
    let optimized = optimize(logical, stats);
    lowering::lower(&optimized, stats)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;

    #[test]
    fn optimize_pushes_a_limit_into_its_data_source() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap());
        let plan_in = LogicalPlan::Limit { limit: 5, offset: 0, child: Box::new(LogicalPlan::data_source("t", table)) };
        let stats = StatsProvider::new();
        let optimized = optimize(plan_in, &stats);
        match optimized {
            LogicalPlan::DataSource { pushed_limit, .. } => assert_eq!(pushed_limit, Some((5, 0))),
            other => panic!("expected DataSource, got {other:?}"),
        }
    }

    #[test]
    fn optimize_terminates_within_the_iteration_cap() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int), Column::new("name", ColumnType::VarChar)]).unwrap());
        let plan_in = LogicalPlan::Projection {
            expressions: vec![Expr::column("id"), Expr::column("name")],
            child: Box::new(LogicalPlan::Selection {
                predicates: vec![Expr::column("id").eq(Expr::literal(common::value::Value::Int(1)))],
                child: Box::new(LogicalPlan::data_source("t", table)),
            }),
        };
        let stats = StatsProvider::new();
        // Mostly a smoke test: this must return rather than loop forever.
        let _ = optimize(plan_in, &stats);
    }

    #[test]
    fn plan_lowers_the_optimized_tree_to_a_table_scan() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap());
        let plan_in = LogicalPlan::Projection { expressions: vec![Expr::column("id")], child: Box::new(LogicalPlan::data_source("t", table)) };
        let stats = StatsProvider::new();
        let physical = plan(plan_in, &stats);
        assert!(matches!(physical, PhysicalPlan::TableScan { .. }));
    }
}
