pub mod cancellation;
pub mod context;
pub mod error;
pub mod eval;
pub mod operators;
pub mod paging;

use std::collections::HashSet;

use common::Row;
use planner::{LogicalPlan, PhysicalPlan, UnionKind};

pub use context::ExecutionContext;
pub use error::{ExecError, ExecResult};

/// What running a plan to completion produces: the column names in
/// projection order, the materialised rows, and a count redundant with
/// `rows.len()` but kept as its own field so callers that only care
/// about the count (`SELECT COUNT(*)` style accounting, row-affected
/// reporting) don't need to clone the row vector to get it.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl ExecutionResult {
    fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        ExecutionResult { columns, rows, row_count }
    }
}

fn columns_of(rows: &[Row]) -> Vec<String> {
    rows.first().map(|r| r.columns().to_vec()).unwrap_or_default()
}

/// Runs one physical plan to completion, per spec.md §4.3's "each
/// physical node exposes an Execute that returns a materialised
/// result" contract. A production engine could switch this to
/// iterator-style streaming without changing any observable behaviour;
/// the spec only mandates the result, not how it's produced.
pub fn execute(plan: &PhysicalPlan, ctx: &ExecutionContext) -> ExecResult<ExecutionResult> {
    if ctx.cancellation.is_cancelled() {
        tracing::debug!("execution cancelled before plan ran");
        return Err(ExecError::Cancelled);
    }
    let rows = execute_rows(plan, ctx)?;
    let columns = columns_of(&rows);
    Ok(ExecutionResult::new(columns, rows))
}

fn execute_rows(plan: &PhysicalPlan, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    match plan {
        PhysicalPlan::TableScan { table, schema, predicates, limit, .. } => operators::table_scan(table, schema, predicates, *limit, ctx),
        PhysicalPlan::Selection { predicates, child, .. } => {
            let child_rows = execute_rows(child, ctx)?;
            operators::selection(predicates, child_rows, ctx)
        }
        PhysicalPlan::Projection { expressions, child } => {
            let child_rows = execute_rows(child, ctx)?;
            operators::projection(expressions, child_rows, ctx)
        }
        PhysicalPlan::Sort { order, child, .. } => {
            let child_rows = operators::buffered(execute_rows(child, ctx)?, ctx)?;
            operators::sort(order, child_rows, ctx)
        }
        PhysicalPlan::Limit { limit, offset, child } => {
            let child_rows = execute_rows(child, ctx)?;
            Ok(operators::limit(*limit, *offset, child_rows))
        }
        PhysicalPlan::HashJoin { kind, conditions, left, right, .. } => {
            let left_rows = operators::buffered(execute_rows(left, ctx)?, ctx)?;
            let right_rows = execute_rows(right, ctx)?;
            operators::hash_join(*kind, conditions, left_rows, right_rows, ctx)
        }
        PhysicalPlan::MergeJoin { kind, conditions, left, right, .. } => {
            let left_rows = execute_rows(left, ctx)?;
            let right_rows = execute_rows(right, ctx)?;
            operators::merge_join(*kind, conditions, left_rows, right_rows, ctx)
        }
        PhysicalPlan::HashSemiJoin { negated, conditions, left, right, .. } => {
            let left_rows = execute_rows(left, ctx)?;
            let right_rows = execute_rows(right, ctx)?;
            operators::hash_semi_join(*negated, conditions, left_rows, right_rows, ctx)
        }
        PhysicalPlan::HashAggregate { aggregates, group_by, child, .. } => {
            let child_rows = operators::buffered(execute_rows(child, ctx)?, ctx)?;
            operators::hash_aggregate(aggregates, group_by, child_rows, ctx)
        }
        PhysicalPlan::Window { partition_by, order, functions, child } => {
            let child_rows = execute_rows(child, ctx)?;
            operators::window(partition_by, order, functions, child_rows, ctx)
        }
        PhysicalPlan::Empty { .. } => Ok(Vec::new()),
    }
}

/// The entry point used for top-level statements and for subqueries:
/// handles `LogicalPlan::Union` directly, since the physical algebra has
/// no dedicated Union node (`planner::lowering::lower` only lowers a
/// Union's first child — see its own doc comment). Everything else goes
/// through the normal optimize-free lower-then-execute path; rewrite
/// optimization already ran once, during planning, so re-running it
/// here on a subquery's already-optimized tree would be wasted work.
pub fn execute_logical(plan: &LogicalPlan, ctx: &ExecutionContext) -> ExecResult<ExecutionResult> {
    if ctx.cancellation.is_cancelled() {
        return Err(ExecError::Cancelled);
    }
    match plan {
        LogicalPlan::Union { kind: UnionKind::Select, all, children } => {
            let mut rows = Vec::new();
            for child in children {
                rows.extend(execute_logical(child, ctx)?.rows);
            }
            if !all {
                let mut seen = HashSet::new();
                rows.retain(|row| seen.insert(operators::row_key(row)));
            }
            let columns = columns_of(&rows);
            Ok(ExecutionResult::new(columns, rows))
        }
        other => {
            let physical = planner::lowering::lower(other, &ctx.stats);
            execute(&physical, ctx)
        }
    }
}
