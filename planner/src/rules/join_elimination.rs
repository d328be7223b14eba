use common::schema::TableRef;

use crate::expr::{BinaryOperator, Expr};
use crate::logical::{JoinKind, LogicalPlan};
use crate::rules::{Rule, RuleResult};
use crate::stats::StatsProvider;

/// Removes an inner join that is provably 1:1 on a foreign-key/primary-
/// key pair when the upper plan does not use any column of one side.
/// Detecting "the upper plan does not use any column" requires seeing
/// both the join and its consumer together, so this rule only fires on
/// the common Projection-directly-over-Join shape; a join with no
/// enclosing projection is left for the executor to run as written.
pub struct JoinElimination;

impl Rule for JoinElimination {
    fn name(&self) -> &'static str {
        "join_elimination"
    }

    fn apply(&self, plan: LogicalPlan, _stats: &StatsProvider) -> RuleResult {
        let LogicalPlan::Projection { expressions, child } = plan else {
            return (plan, false);
        };
        let LogicalPlan::Join { kind: JoinKind::Inner, conditions, left, right } = *child else {
            return (LogicalPlan::Projection { expressions, child }, false);
        };

        let mut required = Vec::new();
        for expr in &expressions {
            expr.referenced_columns(&mut required);
        }

        if let Some(keep_left) = eliminable_side(&conditions, &left, &right, &required) {
            let surviving = if keep_left { left } else { right };
            return (LogicalPlan::Projection { expressions, child: surviving }, true);
        }

        (
            LogicalPlan::Projection { expressions, child: Box::new(LogicalPlan::Join { kind: JoinKind::Inner, conditions, left, right }) },
            false,
        )
    }
}

/// Returns `Some(true)` if the left side alone suffices (the right side
/// is the eliminable FK/PK dimension), `Some(false)` for the symmetric
/// case, `None` when no condition qualifies.
fn eliminable_side(conditions: &[Expr], left: &LogicalPlan, right: &LogicalPlan, required: &[String]) -> Option<bool> {
    for condition in conditions {
        let Expr::BinaryOp { left: l, op: BinaryOperator::Eq, right: r } = condition else { continue };
        let (Expr::Column(lc), Expr::Column(rc)) = (l.as_ref(), r.as_ref()) else { continue };

        if column_is_primary_key(right, rc) && !uses_any_other_right_column(required, right, rc) {
            return Some(true);
        }
        if column_is_primary_key(left, lc) && !uses_any_other_right_column(required, left, lc) {
            return Some(false);
        }
    }
    None
}

fn uses_any_other_right_column(required: &[String], side: &LogicalPlan, join_key: &str) -> bool {
    let side_columns = side.output_schema();
    required.iter().any(|c| side_columns.contains(c) && c != join_key)
}

fn column_is_primary_key(plan: &LogicalPlan, column: &str) -> bool {
    schema_of(plan).map(|schema| schema.column(column).is_some_and(|c| c.primary_key)).unwrap_or(false)
}

fn schema_of(plan: &LogicalPlan) -> Option<&TableRef> {
    match plan {
        LogicalPlan::DataSource { schema, .. } => Some(schema),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;

    #[test]
    fn eliminates_join_against_unused_primary_key_side() {
        let orders = Arc::new(Table::new("orders", vec![Column::new("id", ColumnType::Int).primary(), Column::new("customer_id", ColumnType::Int)]).unwrap());
        let customers = Arc::new(Table::new("customers", vec![Column::new("id", ColumnType::Int).primary()]).unwrap());
        let plan = LogicalPlan::Projection {
            expressions: vec![Expr::column("id")],
            child: Box::new(LogicalPlan::Join {
                kind: JoinKind::Inner,
                conditions: vec![Expr::column("customer_id").eq(Expr::column("id"))],
                left: Box::new(LogicalPlan::data_source("orders", orders)),
                right: Box::new(LogicalPlan::data_source("customers", customers)),
            }),
        };
        let (rewritten, changed) = JoinElimination.apply(plan, &StatsProvider::new());
        assert!(changed);
        match rewritten {
            LogicalPlan::Projection { child, .. } => assert!(matches!(*child, LogicalPlan::DataSource { .. })),
            other => panic!("expected Projection, got {other:?}"),
        }
    }
}
