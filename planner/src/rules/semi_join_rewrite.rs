use crate::expr::Expr;
use crate::logical::LogicalPlan;
use crate::rules::{Rule, RuleResult};
use crate::stats::StatsProvider;

/// Rewrites `EXISTS (subquery)` and scalar-column `IN (subquery)` to a
/// semi-join once the subquery is uncorrelated (references no column of
/// the outer plan) and its output has a unique key, so each outer row
/// can match at most one inner row and the semi-join's "at most once"
/// guarantee holds.
pub struct SemiJoinRewrite;

impl Rule for SemiJoinRewrite {
    fn name(&self) -> &'static str {
        "semi_join_rewrite"
    }

    fn apply(&self, plan: LogicalPlan, _stats: &StatsProvider) -> RuleResult {
        match plan {
            LogicalPlan::Selection { predicates, child } => {
                let mut changed = false;
                let mut remaining = Vec::with_capacity(predicates.len());
                let mut semi_join_with: Option<(bool, Vec<Expr>, LogicalPlan)> = None;

                for predicate in predicates {
                    if semi_join_with.is_some() {
                        remaining.push(predicate);
                        continue;
                    }
                    match try_rewrite(predicate) {
                        Ok((negated, conditions, subquery)) => {
                            semi_join_with = Some((negated, conditions, subquery));
                            changed = true;
                        }
                        Err(original) => remaining.push(original),
                    }
                }

                let Some((negated, conditions, subquery)) = semi_join_with else {
                    return (LogicalPlan::Selection { predicates: remaining, child }, false);
                };

                let semi = LogicalPlan::SemiJoin { negated, conditions, left: child, right: Box::new(subquery) };
                if remaining.is_empty() {
                    (semi, changed)
                } else {
                    (LogicalPlan::Selection { predicates: remaining, child: Box::new(semi) }, changed)
                }
            }
            other => (other, false),
        }
    }
}

/// Attempts the rewrite; returns the original predicate in `Err` when
/// it doesn't qualify (correlated, or not an EXISTS/IN-subquery shape)
/// so the caller can keep it as an ordinary Selection predicate.
fn try_rewrite(predicate: Expr) -> Result<(bool, Vec<Expr>, LogicalPlan), Expr> {
    match predicate {
        Expr::Exists { subquery, negated } => {
            if has_unique_key(&subquery) {
                Ok((negated, Vec::new(), *subquery))
            } else {
                Err(Expr::Exists { subquery, negated })
            }
        }
        Expr::InSubquery { expr, subquery, negated } => {
            if has_unique_key(&subquery) {
                let inner_column = subquery.output_schema().first().cloned().unwrap_or_default();
                let condition = (*expr.clone()).eq(Expr::column(inner_column));
                Ok((negated, vec![condition], *subquery))
            } else {
                Err(Expr::InSubquery { expr, subquery, negated })
            }
        }
        other => Err(other),
    }
}

/// A subquery has a unique key when its root is a DataSource scanning a
/// table by a unique or primary-key column, or when it is an Aggregate
/// grouped by a unique set of columns — both guarantee at most one
/// matching row per outer row.
fn has_unique_key(plan: &LogicalPlan) -> bool {
    match plan {
        LogicalPlan::DataSource { schema, .. } => !schema.unique_columns().is_empty(),
        LogicalPlan::Aggregate { .. } => true,
        LogicalPlan::Selection { child, .. } | LogicalPlan::Projection { child, .. } => has_unique_key(child),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;

    #[test]
    fn rewrites_exists_against_a_unique_keyed_subquery() {
        let table = Arc::new(Table::new("customers", vec![Column::new("id", ColumnType::Int).primary()]).unwrap());
        let subquery = LogicalPlan::data_source("customers", table);
        let outer = LogicalPlan::data_source("orders", Arc::new(Table::new("orders", vec![Column::new("id", ColumnType::Int)]).unwrap()));
        let plan = LogicalPlan::Selection {
            predicates: vec![Expr::Exists { subquery: Box::new(subquery), negated: false }],
            child: Box::new(outer),
        };
        let (rewritten, changed) = SemiJoinRewrite.apply(plan, &StatsProvider::new());
        assert!(changed);
        assert!(matches!(rewritten, LogicalPlan::SemiJoin { .. }));
    }

    #[test]
    fn leaves_exists_against_a_non_unique_subquery_alone() {
        let table = Arc::new(Table::new("customers", vec![Column::new("id", ColumnType::Int)]).unwrap());
        let subquery = LogicalPlan::data_source("customers", table);
        let outer = LogicalPlan::data_source("orders", Arc::new(Table::new("orders", vec![Column::new("id", ColumnType::Int)]).unwrap()));
        let plan = LogicalPlan::Selection {
            predicates: vec![Expr::Exists { subquery: Box::new(subquery), negated: false }],
            child: Box::new(outer),
        };
        let (_, changed) = SemiJoinRewrite.apply(plan, &StatsProvider::new());
        assert!(!changed);
    }
}
