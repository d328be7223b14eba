use common::{Row, Value};
use planner::{BinaryOperator, Expr};

use crate::context::ExecutionContext;
use crate::error::ExecResult;

/// Evaluates a scalar expression against one row's column mapping, per
/// spec.md §4.3's Selection/Projection semantics: mixed-type comparisons
/// coerce numerically when both sides parse as numbers, NULL compared to
/// anything is unknown, and `IN`/`EXISTS` against a subquery the planner
/// couldn't rewrite into a join is evaluated by actually running it.
pub fn eval(expr: &Expr, row: &Row, ctx: &ExecutionContext) -> ExecResult<Value> {
    match expr {
        Expr::Column(name) => Ok(row.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Literal(value) => Ok(value.clone()),
        Expr::BinaryOp { left, op, right } => eval_binary(left, *op, right, row, ctx),
        Expr::Not(inner) => match as_bool(&eval(inner, row, ctx)?) {
            Some(b) => Ok(Value::Bool(!b)),
            None => Ok(Value::Null),
        },
        Expr::Like { expr, pattern, negated } => {
            let value = eval(expr, row, ctx)?;
            let pattern = eval(pattern, row, ctx)?;
            if value.is_null() || pattern.is_null() {
                return Ok(Value::Null);
            }
            let matched = value.like(&pattern.as_str_lossy());
            Ok(Value::Bool(matched != *negated))
        }
        Expr::In { expr, list, negated } => {
            let value = eval(expr, row, ctx)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let mut matched = false;
            for item in list {
                let item = eval(item, row, ctx)?;
                if value.sql_eq(&item) == Some(true) {
                    matched = true;
                    break;
                }
            }
            Ok(Value::Bool(matched != *negated))
        }
        Expr::Between { expr, low, high, negated } => {
            let value = eval(expr, row, ctx)?;
            let low = eval(low, row, ctx)?;
            let high = eval(high, row, ctx)?;
            let (Some(ge_low), Some(le_high)) = (value.sql_cmp(&low), value.sql_cmp(&high)) else {
                return Ok(Value::Null);
            };
            let within = ge_low.is_ge() && le_high.is_le();
            Ok(Value::Bool(within != *negated))
        }
        Expr::IsNull { expr, negated } => {
            let value = eval(expr, row, ctx)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }
        Expr::Alias { expr, .. } => eval(expr, row, ctx),
        Expr::InSubquery { expr, subquery, negated } => {
            let value = eval(expr, row, ctx)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let column = subquery.output_schema().first().cloned();
            let rows = ctx.execute_subquery(subquery)?;
            let matched = match column {
                Some(column) => rows.iter().any(|r| r.get(&column).is_some_and(|v| value.sql_eq(v) == Some(true))),
                None => false,
            };
            Ok(Value::Bool(matched != *negated))
        }
        Expr::Exists { subquery, negated } => {
            let rows = ctx.execute_subquery(subquery)?;
            Ok(Value::Bool(!rows.is_empty() != *negated))
        }
    }
}

fn eval_binary(left: &Expr, op: BinaryOperator, right: &Expr, row: &Row, ctx: &ExecutionContext) -> ExecResult<Value> {
    if matches!(op, BinaryOperator::And | BinaryOperator::Or) {
        let left = as_bool(&eval(left, row, ctx)?);
        let right = as_bool(&eval(right, row, ctx)?);
        return Ok(match op {
            BinaryOperator::And => kleene_and(left, right),
            BinaryOperator::Or => kleene_or(left, right),
            _ => unreachable!(),
        });
    }
    let left = eval(left, row, ctx)?;
    let right = eval(right, row, ctx)?;
    let comparison = match op {
        BinaryOperator::Eq => left.sql_eq(&right),
        BinaryOperator::NotEq => left.sql_eq(&right).map(|b| !b),
        BinaryOperator::Lt => left.sql_cmp(&right).map(|o| o.is_lt()),
        BinaryOperator::LtEq => left.sql_cmp(&right).map(|o| o.is_le()),
        BinaryOperator::Gt => left.sql_cmp(&right).map(|o| o.is_gt()),
        BinaryOperator::GtEq => left.sql_cmp(&right).map(|o| o.is_ge()),
        BinaryOperator::And | BinaryOperator::Or => unreachable!(),
    };
    Ok(comparison.map(Value::Bool).unwrap_or(Value::Null))
}

/// SQL three-valued logic's `UNKNOWN` state, represented as `None`.
fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        other => other.as_f64().map(|n| n != 0.0),
    }
}

fn kleene_and(left: Option<bool>, right: Option<bool>) -> Value {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Value::Bool(false),
        (Some(true), Some(true)) => Value::Bool(true),
        _ => Value::Null,
    }
}

fn kleene_or(left: Option<bool>, right: Option<bool>) -> Value {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Value::Bool(true),
        (Some(false), Some(false)) => Value::Bool(false),
        _ => Value::Null,
    }
}

/// Whether an evaluated predicate value counts as a match: `true` only,
/// never `NULL`/unknown, per SQL's `WHERE` semantics.
pub fn is_truthy(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

#[cfg(test)]
mod tests {
    use common::RowBuilder;

    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(std::collections::HashMap::new())
    }

    fn row() -> Row {
        let mut b = RowBuilder::new();
        b.push("a", Value::Int(5));
        b.push("b", Value::Null);
        b.build()
    }

    #[test]
    fn null_comparison_is_unknown_not_false() {
        let expr = Expr::column("b").eq(Expr::literal(Value::Int(1)));
        let result = eval(&expr, &row(), &ctx()).unwrap();
        assert!(result.is_null());
        assert!(!is_truthy(&result));
    }

    #[test]
    fn numeric_comparison_matches() {
        let expr = Expr::column("a").eq(Expr::literal(Value::Int(5)));
        let result = eval(&expr, &row(), &ctx()).unwrap();
        assert!(is_truthy(&result));
    }

    #[test]
    fn and_with_one_false_branch_is_false_even_with_unknown_other() {
        let expr = Expr::column("b").eq(Expr::literal(Value::Int(1))).binary(BinaryOperator::And, Expr::literal(Value::Bool(false)));
        let result = eval(&expr, &row(), &ctx()).unwrap();
        assert_eq!(result, Value::Bool(false));
    }
}
