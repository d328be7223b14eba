use crate::logical::LogicalPlan;
use crate::rules::{Rule, RuleResult};
use crate::stats::StatsProvider;

/// From the root Projection downward, restricts any DataSource to the
/// columns actually required above it. Applied at a Projection node
/// only (the natural place required columns are first known); lower
/// DataSource nodes reachable through Selection/Sort/Limit without an
/// intervening Projection keep their full column set, matching spec.md's
/// "propagate the reduced schema through Selections" scoping.
pub struct ColumnPruning;

impl Rule for ColumnPruning {
    fn name(&self) -> &'static str {
        "column_pruning"
    }

    fn apply(&self, plan: LogicalPlan, _stats: &StatsProvider) -> RuleResult {
        match plan {
            LogicalPlan::Projection { expressions, child } => {
                let mut required = Vec::new();
                for expr in &expressions {
                    expr.referenced_columns(&mut required);
                }
                let (child, changed) = restrict(*child, &required);
                (LogicalPlan::Projection { expressions, child: Box::new(child) }, changed)
            }
            other => (other, false),
        }
    }
}

fn restrict(plan: LogicalPlan, required: &[String]) -> RuleResult {
    match plan {
        LogicalPlan::DataSource { table, schema, output_columns, pushed_predicates, pushed_limit } => {
            let mut columns: Vec<String> = required.to_vec();
            for predicate in &pushed_predicates {
                predicate.referenced_columns(&mut columns);
            }
            columns.sort();
            columns.dedup();
            let already = output_columns.as_ref() == Some(&columns);
            (LogicalPlan::DataSource { table, schema, output_columns: Some(columns), pushed_predicates, pushed_limit }, !already)
        }
        LogicalPlan::Selection { predicates, child } => {
            let mut required = required.to_vec();
            for predicate in &predicates {
                predicate.referenced_columns(&mut required);
            }
            let (child, changed) = restrict(*child, &required);
            (LogicalPlan::Selection { predicates, child: Box::new(child) }, changed)
        }
        LogicalPlan::Sort { order, child } => {
            let mut required = required.to_vec();
            for item in &order {
                item.expr.referenced_columns(&mut required);
            }
            let (child, changed) = restrict(*child, &required);
            (LogicalPlan::Sort { order, child: Box::new(child) }, changed)
        }
        LogicalPlan::Limit { limit, offset, child } => {
            let (child, changed) = restrict(*child, required);
            (LogicalPlan::Limit { limit, offset, child: Box::new(child) }, changed)
        }
        other => (other, false),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;
    use crate::expr::Expr;

    #[test]
    fn restricts_data_source_to_projected_columns() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int), Column::new("name", ColumnType::VarChar)]).unwrap());
        let plan = LogicalPlan::Projection { expressions: vec![Expr::column("id")], child: Box::new(LogicalPlan::data_source("t", table)) };
        let (rewritten, changed) = ColumnPruning.apply(plan, &StatsProvider::new());
        assert!(changed);
        match rewritten {
            LogicalPlan::Projection { child, .. } => match *child {
                LogicalPlan::DataSource { output_columns, .. } => assert_eq!(output_columns, Some(vec!["id".to_string()])),
                other => panic!("expected DataSource, got {other:?}"),
            },
            other => panic!("expected Projection, got {other:?}"),
        }
    }
}
