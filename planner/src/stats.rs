use std::collections::HashMap;

use crate::expr::{BinaryOperator, Expr};
use crate::logical::LogicalPlan;

/// Per-column statistics used to sharpen the default selectivity
/// guesses below. Absent a registered column, the defaults apply.
#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    pub ndv: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// The cardinality estimator's external knowledge: row counts per table
/// and, optionally, per-column statistics. Populated by the statistics
/// refresher background task; a fresh provider with no entries falls
/// back to the defaults spec.md names.
#[derive(Debug, Clone, Default)]
pub struct StatsProvider {
    row_counts: HashMap<String, f64>,
    column_stats: HashMap<(String, String), ColumnStats>,
}

impl StatsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_row_count(&mut self, table: impl Into<String>, rows: f64) {
        self.row_counts.insert(table.into(), rows);
    }

    pub fn set_column_stats(&mut self, table: impl Into<String>, column: impl Into<String>, stats: ColumnStats) {
        self.column_stats.insert((table.into(), column.into()), stats);
    }

    pub fn row_count(&self, table: &str) -> Option<f64> {
        self.row_counts.get(table).copied()
    }

    pub fn column_stats(&self, table: &str, column: &str) -> Option<&ColumnStats> {
        self.column_stats.get(&(table.to_string(), column.to_string()))
    }
}

pub const DEFAULT_ROW_COUNT: f64 = 1000.0;
pub const EQUALITY_SELECTIVITY: f64 = 0.1;
pub const RANGE_SELECTIVITY: f64 = 0.3;
pub const IN_SELECTIVITY: f64 = 0.2;
pub const BETWEEN_SELECTIVITY: f64 = 0.3;
pub const LIKE_SELECTIVITY: f64 = 0.25;
const OR_SELECTIVITY_CAP: f64 = 0.95;

/// Estimates the number of rows a logical plan node produces, the
/// recursive base every cost computation builds on.
pub fn estimate_cardinality(plan: &LogicalPlan, stats: &StatsProvider) -> f64 {
    match plan {
        LogicalPlan::DataSource { table, pushed_predicates, pushed_limit, .. } => {
            let base = stats.row_count(table).unwrap_or(DEFAULT_ROW_COUNT);
            let selectivity = pushed_predicates.iter().map(|p| estimate_selectivity(p, table, stats)).product::<f64>();
            let rows = base * selectivity.max(0.0);
            match pushed_limit {
                Some((limit, _offset)) => rows.min(*limit as f64),
                None => rows,
            }
        }
        LogicalPlan::Selection { predicates, child } => {
            let input = estimate_cardinality(child, stats);
            let table = source_table_name(child);
            let selectivity = predicates.iter().map(|p| estimate_selectivity(p, table.as_deref().unwrap_or(""), stats)).product::<f64>();
            input * selectivity.max(0.0)
        }
        LogicalPlan::Projection { child, .. } => estimate_cardinality(child, stats),
        LogicalPlan::Sort { child, .. } => estimate_cardinality(child, stats),
        LogicalPlan::Limit { limit, child, .. } => estimate_cardinality(child, stats).min(*limit as f64),
        LogicalPlan::Join { left, right, .. } => {
            let left_rows = estimate_cardinality(left, stats);
            let right_rows = estimate_cardinality(right, stats);
            // A join's output is bounded by the cross product scaled down
            // by a generic equality-join selectivity; a proper cost model
            // would use the join key's NDV, handled by the join-reorder
            // rule directly against column stats.
            (left_rows * right_rows * EQUALITY_SELECTIVITY).max(left_rows.max(right_rows))
        }
        LogicalPlan::SemiJoin { negated, left, .. } => {
            let left_rows = estimate_cardinality(left, stats);
            if *negated { left_rows * (1.0 - EQUALITY_SELECTIVITY) } else { left_rows * EQUALITY_SELECTIVITY.min(1.0) }
        }
        LogicalPlan::Aggregate { group_by, child, .. } => {
            let input = estimate_cardinality(child, stats);
            if group_by.is_empty() {
                1.0
            } else {
                (input * 0.2).max(1.0)
            }
        }
        LogicalPlan::Union { children, .. } => children.iter().map(|c| estimate_cardinality(c, stats)).sum(),
        LogicalPlan::Empty { .. } => 0.0,
    }
}

fn source_table_name(plan: &LogicalPlan) -> Option<String> {
    match plan {
        LogicalPlan::DataSource { table, .. } => Some(table.clone()),
        LogicalPlan::Selection { child, .. } | LogicalPlan::Projection { child, .. } | LogicalPlan::Sort { child, .. } | LogicalPlan::Limit { child, .. } => {
            source_table_name(child)
        }
        _ => None,
    }
}

/// Selectivity of one predicate, using column statistics when available
/// and the spec's fixed defaults otherwise.
pub fn estimate_selectivity(predicate: &Expr, table: &str, stats: &StatsProvider) -> f64 {
    match predicate {
        Expr::BinaryOp { left, op: BinaryOperator::And, right } => {
            estimate_selectivity(left, table, stats) * estimate_selectivity(right, table, stats)
        }
        Expr::BinaryOp { left, op: BinaryOperator::Or, right } => {
            let a = estimate_selectivity(left, table, stats);
            let b = estimate_selectivity(right, table, stats);
            (a + b - a * b).min(OR_SELECTIVITY_CAP)
        }
        Expr::BinaryOp { left, op: BinaryOperator::Eq, right } => equality_selectivity(left, right, table, stats),
        Expr::BinaryOp { left, op: BinaryOperator::NotEq, right } => 1.0 - equality_selectivity(left, right, table, stats),
        Expr::BinaryOp { left, op: BinaryOperator::Lt | BinaryOperator::LtEq | BinaryOperator::Gt | BinaryOperator::GtEq, right } => {
            range_selectivity(left, right, table, stats)
        }
        Expr::In { list, negated, .. } => {
            let s = if list.is_empty() { 0.0 } else { IN_SELECTIVITY };
            if *negated { 1.0 - s } else { s }
        }
        Expr::Between { negated, .. } => {
            if *negated {
                1.0 - BETWEEN_SELECTIVITY
            } else {
                BETWEEN_SELECTIVITY
            }
        }
        Expr::Like { negated, .. } => {
            if *negated {
                1.0 - LIKE_SELECTIVITY
            } else {
                LIKE_SELECTIVITY
            }
        }
        Expr::Not(inner) => 1.0 - estimate_selectivity(inner, table, stats),
        _ => 1.0,
    }
}

fn equality_selectivity(left: &Expr, _right: &Expr, table: &str, stats: &StatsProvider) -> f64 {
    if let Expr::Column(name) = left {
        if let Some(col) = stats.column_stats(table, name) {
            if col.ndv > 0 {
                return 1.0 / col.ndv as f64;
            }
        }
    }
    EQUALITY_SELECTIVITY
}

fn range_selectivity(left: &Expr, right: &Expr, table: &str, stats: &StatsProvider) -> f64 {
    if let (Expr::Column(name), Expr::Literal(value)) = (left, right) {
        if let (Some(col), Some(v)) = (stats.column_stats(table, name), value.as_f64()) {
            if let (Some(min), Some(max)) = (col.min, col.max) {
                if max > min {
                    if v < min || v > max {
                        return 0.0;
                    }
                    return ((v - min) / (max - min)).clamp(0.0, 1.0);
                }
            }
        }
    }
    RANGE_SELECTIVITY
}

#[cfg(test)]
mod tests {
    use common::value::Value;

    use super::*;

    #[test]
    fn equality_uses_column_ndv_when_available() {
        let mut stats = StatsProvider::new();
        stats.set_column_stats("t", "id", ColumnStats { ndv: 50, min: None, max: None });
        let predicate = Expr::column("id").eq(Expr::literal(Value::Int(1)));
        assert_eq!(estimate_selectivity(&predicate, "t", &stats), 1.0 / 50.0);
    }

    #[test]
    fn equality_falls_back_to_default_selectivity() {
        let stats = StatsProvider::new();
        let predicate = Expr::column("id").eq(Expr::literal(Value::Int(1)));
        assert_eq!(estimate_selectivity(&predicate, "t", &stats), EQUALITY_SELECTIVITY);
    }

    #[test]
    fn out_of_range_value_has_zero_selectivity() {
        let mut stats = StatsProvider::new();
        stats.set_column_stats("t", "id", ColumnStats { ndv: 0, min: Some(0.0), max: Some(10.0) });
        let predicate = Expr::BinaryOp { left: Box::new(Expr::column("id")), op: BinaryOperator::Gt, right: Box::new(Expr::literal(Value::Int(100))) };
        assert_eq!(estimate_selectivity(&predicate, "t", &stats), 0.0);
    }
}
