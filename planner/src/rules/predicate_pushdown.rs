use crate::logical::LogicalPlan;
use crate::rules::{Rule, RuleResult};
use crate::stats::StatsProvider;

/// Merges a Selection with a child DataSource by attaching its
/// conditions to the DataSource's pushed-down-predicate list, and
/// merges Selection-over-Selection by union of conditions. Does not
/// push a Selection past a Projection that renames, or past an
/// Aggregate.
pub struct PredicatePushdown;

impl Rule for PredicatePushdown {
    fn name(&self) -> &'static str {
        "predicate_pushdown"
    }

    fn apply(&self, plan: LogicalPlan, _stats: &StatsProvider) -> RuleResult {
        match plan {
            LogicalPlan::Selection { predicates, child } => match *child {
                LogicalPlan::DataSource { table, schema, output_columns, mut pushed_predicates, pushed_limit } => {
                    pushed_predicates.extend(predicates);
                    (LogicalPlan::DataSource { table, schema, output_columns, pushed_predicates, pushed_limit }, true)
                }
                LogicalPlan::Selection { predicates: inner_predicates, child: inner_child } => {
                    let mut merged = inner_predicates;
                    merged.extend(predicates);
                    (LogicalPlan::Selection { predicates: merged, child: inner_child }, true)
                }
                other => (LogicalPlan::Selection { predicates, child: Box::new(other) }, false),
            },
            other => (other, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::{ColumnType, Value};

    use super::*;
    use crate::expr::Expr;

    fn sample_table() -> Arc<Table> {
        Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap())
    }

    #[test]
    fn merges_selection_into_data_source() {
        let predicate = Expr::column("id").eq(Expr::literal(Value::Int(1)));
        let plan = LogicalPlan::Selection {
            predicates: vec![predicate],
            child: Box::new(LogicalPlan::data_source("t", sample_table())),
        };
        let (rewritten, changed) = PredicatePushdown.apply(plan, &StatsProvider::new());
        assert!(changed);
        match rewritten {
            LogicalPlan::DataSource { pushed_predicates, .. } => assert_eq!(pushed_predicates.len(), 1),
            other => panic!("expected DataSource, got {other:?}"),
        }
    }

    #[test]
    fn does_not_touch_a_selection_over_a_projection() {
        let predicate = Expr::column("id").eq(Expr::literal(Value::Int(1)));
        let child = LogicalPlan::Projection {
            expressions: vec![Expr::column("id")],
            child: Box::new(LogicalPlan::data_source("t", sample_table())),
        };
        let plan = LogicalPlan::Selection { predicates: vec![predicate], child: Box::new(child) };
        let (_, changed) = PredicatePushdown.apply(plan, &StatsProvider::new());
        assert!(!changed);
    }
}
