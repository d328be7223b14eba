use common::value::Value;

use crate::expr::{BinaryOperator, Expr};
use crate::logical::LogicalPlan;
use crate::rules::{Rule, RuleResult};
use crate::stats::StatsProvider;

/// Evaluates any expression whose operands are all literals at plan
/// time. A Selection whose folded predicate is always false becomes an
/// empty scan; one that is always true is dropped.
pub struct ConstantFolding;

impl Rule for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant_folding"
    }

    fn apply(&self, plan: LogicalPlan, _stats: &StatsProvider) -> RuleResult {
        match plan {
            LogicalPlan::Selection { predicates, child } => {
                let mut changed = false;
                let mut remaining = Vec::with_capacity(predicates.len());
                let mut always_false = false;
                for predicate in predicates {
                    let (folded, did_fold) = fold(predicate);
                    changed |= did_fold;
                    match folded {
                        Expr::Literal(Value::Bool(true)) => {}
                        Expr::Literal(Value::Bool(false)) => always_false = true,
                        other => remaining.push(other),
                    }
                }
                if always_false {
                    return (empty_scan(&child), true);
                }
                if remaining.is_empty() {
                    return (*child, true);
                }
                (LogicalPlan::Selection { predicates: remaining, child }, changed)
            }
            other => (other, false),
        }
    }
}

/// A Selection directly over a `DataSource` keeps scanning that table
/// (with a zero limit, so no row ever actually comes back); anything
/// else (a `Join`, `Aggregate`, `Sort`, ...) has no table to attach a
/// zero-row scan to, so it folds to an explicit `Empty` node carrying
/// the child's own output schema instead.
fn empty_scan(child: &LogicalPlan) -> LogicalPlan {
    match child {
        LogicalPlan::DataSource { table, schema, .. } => LogicalPlan::DataSource {
            table: table.clone(),
            schema: schema.clone(),
            output_columns: None,
            pushed_predicates: Vec::new(),
            pushed_limit: Some((0, 0)),
        },
        other => LogicalPlan::Empty { columns: other.output_schema() },
    }
}

/// Folds an expression tree bottom-up, returning the folded expression
/// and whether any folding happened.
fn fold(expr: Expr) -> (Expr, bool) {
    match expr {
        Expr::BinaryOp { left, op, right } => {
            let (left, lf) = fold(*left);
            let (right, rf) = fold(*right);
            if let (Expr::Literal(l), Expr::Literal(r)) = (&left, &right) {
                if let Some(folded) = eval_binary(op, l, r) {
                    return (Expr::Literal(folded), true);
                }
            }
            (Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) }, lf || rf)
        }
        Expr::Not(inner) => {
            let (inner, f) = fold(*inner);
            if let Expr::Literal(Value::Bool(b)) = inner {
                return (Expr::Literal(Value::Bool(!b)), true);
            }
            (Expr::Not(Box::new(inner)), f)
        }
        other => (other, false),
    }
}

fn eval_binary(op: BinaryOperator, left: &Value, right: &Value) -> Option<Value> {
    match op {
        BinaryOperator::Eq => left.sql_eq(right).map(Value::Bool),
        BinaryOperator::NotEq => left.sql_eq(right).map(|b| Value::Bool(!b)),
        BinaryOperator::Lt => left.sql_cmp(right).map(|o| Value::Bool(o.is_lt())),
        BinaryOperator::LtEq => left.sql_cmp(right).map(|o| Value::Bool(o.is_le())),
        BinaryOperator::Gt => left.sql_cmp(right).map(|o| Value::Bool(o.is_gt())),
        BinaryOperator::GtEq => left.sql_cmp(right).map(|o| Value::Bool(o.is_ge())),
        BinaryOperator::And => match (as_bool(left), as_bool(right)) {
            (Some(a), Some(b)) => Some(Value::Bool(a && b)),
            _ => None,
        },
        BinaryOperator::Or => match (as_bool(left), as_bool(right)) {
            (Some(a), Some(b)) => Some(Value::Bool(a || b)),
            _ => None,
        },
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;

    fn sample_table() -> Arc<Table> {
        Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap())
    }

    #[test]
    fn false_predicate_becomes_an_empty_scan() {
        let predicate = Expr::literal(Value::Int(1)).eq(Expr::literal(Value::Int(2)));
        let plan = LogicalPlan::Selection { predicates: vec![predicate], child: Box::new(LogicalPlan::data_source("t", sample_table())) };
        let (rewritten, changed) = ConstantFolding.apply(plan, &StatsProvider::new());
        assert!(changed);
        match rewritten {
            LogicalPlan::DataSource { pushed_limit, .. } => assert_eq!(pushed_limit, Some((0, 0))),
            other => panic!("expected DataSource, got {other:?}"),
        }
    }

    #[test]
    fn true_predicate_is_dropped() {
        let predicate = Expr::literal(Value::Int(1)).eq(Expr::literal(Value::Int(1)));
        let plan = LogicalPlan::Selection { predicates: vec![predicate], child: Box::new(LogicalPlan::data_source("t", sample_table())) };
        let (rewritten, changed) = ConstantFolding.apply(plan, &StatsProvider::new());
        assert!(changed);
        assert!(matches!(rewritten, LogicalPlan::DataSource { pushed_limit: None, .. }));
    }

    #[test]
    fn false_predicate_over_a_join_becomes_an_empty_node_not_a_fabricated_table() {
        let predicate = Expr::literal(Value::Int(1)).eq(Expr::literal(Value::Int(2)));
        let join = LogicalPlan::Join {
            kind: crate::logical::JoinKind::Inner,
            conditions: Vec::new(),
            left: Box::new(LogicalPlan::data_source("t", sample_table())),
            right: Box::new(LogicalPlan::data_source("t", sample_table())),
        };
        let plan = LogicalPlan::Selection { predicates: vec![predicate], child: Box::new(join) };
        let (rewritten, changed) = ConstantFolding.apply(plan, &StatsProvider::new());
        assert!(changed);
        match rewritten {
            LogicalPlan::Empty { columns } => assert_eq!(columns, vec!["id".to_string(), "right_id".to_string()]),
            other => panic!("expected Empty, got {other:?}"),
        }
    }
}
