use crate::expr::Expr;
use crate::logical::LogicalPlan;
use crate::rules::{Rule, RuleResult};
use crate::stats::StatsProvider;

/// Removes a Projection whose expressions are exactly the child's
/// columns, in the child's order — a no-op projection left behind by
/// earlier translation or rewriting.
pub struct ProjectionElimination;

impl Rule for ProjectionElimination {
    fn name(&self) -> &'static str {
        "projection_elimination"
    }

    fn apply(&self, plan: LogicalPlan, _stats: &StatsProvider) -> RuleResult {
        match plan {
            LogicalPlan::Projection { expressions, child } => {
                let child_schema = child.output_schema();
                let is_identity = expressions.len() == child_schema.len()
                    && expressions.iter().zip(child_schema.iter()).all(|(expr, name)| matches!(expr, Expr::Column(c) if c == name));
                if is_identity {
                    (*child, true)
                } else {
                    (LogicalPlan::Projection { expressions, child }, false)
                }
            }
            other => (other, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;

    #[test]
    fn removes_an_identity_projection() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap());
        let plan = LogicalPlan::Projection { expressions: vec![Expr::column("id")], child: Box::new(LogicalPlan::data_source("t", table)) };
        let (rewritten, changed) = ProjectionElimination.apply(plan, &StatsProvider::new());
        assert!(changed);
        assert!(matches!(rewritten, LogicalPlan::DataSource { .. }));
    }

    #[test]
    fn keeps_a_reordering_projection() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int), Column::new("name", ColumnType::VarChar)]).unwrap());
        let plan =
            LogicalPlan::Projection { expressions: vec![Expr::column("name"), Expr::column("id")], child: Box::new(LogicalPlan::data_source("t", table)) };
        let (_, changed) = ProjectionElimination.apply(plan, &StatsProvider::new());
        assert!(!changed);
    }
}
