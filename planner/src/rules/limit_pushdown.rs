use crate::logical::LogicalPlan;
use crate::rules::{Rule, RuleResult};
use crate::stats::StatsProvider;

/// A Limit directly above a DataSource is absorbed as the DataSource's
/// own (limit, offset). A Limit above a Selection becomes
/// Selection(Limit(child)) only when the Selection's predicates are
/// exactly those already pushed into the DataSource below it — pushing
/// a limit below an unresolved filter would be unsound, so the rule
/// declines in that case.
pub struct LimitPushdown;

impl Rule for LimitPushdown {
    fn name(&self) -> &'static str {
        "limit_pushdown"
    }

    fn apply(&self, plan: LogicalPlan, _stats: &StatsProvider) -> RuleResult {
        match plan {
            LogicalPlan::Limit { limit, offset, child } => match *child {
                LogicalPlan::DataSource { table, schema, output_columns, pushed_predicates, pushed_limit: None } => (
                    LogicalPlan::DataSource { table, schema, output_columns, pushed_predicates, pushed_limit: Some((limit, offset)) },
                    true,
                ),
                LogicalPlan::Selection { predicates, child: selection_child } => {
                    if let LogicalPlan::DataSource { pushed_predicates, .. } = selection_child.as_ref() {
                        if predicates_already_pushed(&predicates, pushed_predicates) {
                            let pushed = push_into_source(*selection_child, limit, offset);
                            return (LogicalPlan::Selection { predicates, child: Box::new(pushed) }, true);
                        }
                    }
                    (
                        LogicalPlan::Limit { limit, offset, child: Box::new(LogicalPlan::Selection { predicates, child: selection_child }) },
                        false,
                    )
                }
                other => (LogicalPlan::Limit { limit, offset, child: Box::new(other) }, false),
            },
            other => (other, false),
        }
    }
}

fn predicates_already_pushed(selection_predicates: &[crate::expr::Expr], pushed: &[crate::expr::Expr]) -> bool {
    selection_predicates.len() == pushed.len() && selection_predicates.iter().all(|p| pushed.contains(p))
}

fn push_into_source(source: LogicalPlan, limit: usize, offset: usize) -> LogicalPlan {
    match source {
        LogicalPlan::DataSource { table, schema, output_columns, pushed_predicates, .. } => {
            LogicalPlan::DataSource { table, schema, output_columns, pushed_predicates, pushed_limit: Some((limit, offset)) }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;

    #[test]
    fn absorbs_limit_directly_over_data_source() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap());
        let plan = LogicalPlan::Limit { limit: 10, offset: 0, child: Box::new(LogicalPlan::data_source("t", table)) };
        let (rewritten, changed) = LimitPushdown.apply(plan, &StatsProvider::new());
        assert!(changed);
        match rewritten {
            LogicalPlan::DataSource { pushed_limit, .. } => assert_eq!(pushed_limit, Some((10, 0))),
            other => panic!("expected DataSource, got {other:?}"),
        }
    }
}
