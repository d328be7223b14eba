//! Per-row cost constants and the physical-plan cost function. The
//! exact numbers are tunable; the shape — build-side charged to memory,
//! probe-side charged to CPU, scans dominated by IO — drives the
//! rewrite and join-reorder rules' relative ordering and must not
//! change without revisiting those rules.

use crate::physical::PhysicalPlan;
use crate::stats::StatsProvider;

pub const CPU_COST: f64 = 0.01;
pub const IO_COST: f64 = 0.1;
pub const MEMORY_COST: f64 = 0.001;

pub fn estimate_cost(plan: &PhysicalPlan, stats: &StatsProvider) -> f64 {
    match plan {
        PhysicalPlan::TableScan { rows, .. } => rows * (CPU_COST + IO_COST),
        PhysicalPlan::Selection { rows, child, .. } => estimate_cost(child, stats) + rows * CPU_COST,
        PhysicalPlan::Projection { child, .. } => estimate_cost(child, stats),
        PhysicalPlan::Sort { child, rows, .. } => estimate_cost(child, stats) + rows * CPU_COST * rows.max(1.0).log2(),
        PhysicalPlan::Limit { child, .. } => estimate_cost(child, stats),
        PhysicalPlan::HashJoin { left, right, .. } => {
            let left_rows = left.row_estimate();
            let right_rows = right.row_estimate();
            estimate_cost(left, stats) + estimate_cost(right, stats) + left_rows * CPU_COST + right_rows * CPU_COST + left_rows * MEMORY_COST
        }
        PhysicalPlan::MergeJoin { left, right, .. } => {
            estimate_cost(left, stats) + estimate_cost(right, stats) + (left.row_estimate() + right.row_estimate()) * CPU_COST
        }
        PhysicalPlan::HashSemiJoin { left, right, .. } => {
            estimate_cost(left, stats) + estimate_cost(right, stats) + left.row_estimate() * CPU_COST + right.row_estimate() * MEMORY_COST
        }
        PhysicalPlan::HashAggregate { group_by, rows, child, .. } => {
            estimate_cost(child, stats) + rows * CPU_COST * (1.0 + group_by.len() as f64)
        }
        PhysicalPlan::Window { child, .. } => estimate_cost(child, stats) + child.row_estimate() * CPU_COST,
        PhysicalPlan::Empty { .. } => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::{Column, Table};
    use common::value::ColumnType;

    use super::*;

    #[test]
    fn scan_cost_is_dominated_by_io() {
        let table = Arc::new(Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap());
        let plan = PhysicalPlan::TableScan { table: "t".into(), schema: table, predicates: Vec::new(), limit: None, rows: 100.0 };
        let cost = estimate_cost(&plan, &StatsProvider::new());
        assert!((cost - 100.0 * (CPU_COST + IO_COST)).abs() < 1e-9);
    }
}
