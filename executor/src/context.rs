use std::collections::HashMap;
use std::sync::Arc;

use common::Row;
use datasource::DataSource;
use planner::{LogicalPlan, StatsProvider};

use crate::cancellation::CancellationToken;
use crate::error::{ExecError, ExecResult};
use crate::paging::PagingConfig;

/// Everything a physical plan needs to actually run: the backends a
/// `TableScan` reads from, the estimator a subquery re-lowers against,
/// the cooperative cancellation flag, and the paging budget. One context
/// is built per statement and shared (by reference) across every
/// operator in its tree, including subqueries spawned mid-evaluation.
pub struct ExecutionContext {
    data_sources: HashMap<String, Arc<dyn DataSource>>,
    pub stats: StatsProvider,
    pub cancellation: CancellationToken,
    pub paging: PagingConfig,
}

impl ExecutionContext {
    pub fn new(data_sources: HashMap<String, Arc<dyn DataSource>>) -> Self {
        ExecutionContext { data_sources, stats: StatsProvider::new(), cancellation: CancellationToken::new(), paging: PagingConfig::default() }
    }

    pub fn with_stats(mut self, stats: StatsProvider) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_paging(mut self, paging: PagingConfig) -> Self {
        self.paging = paging;
        self
    }

    pub fn data_source(&self, table: &str) -> ExecResult<&Arc<dyn DataSource>> {
        self.data_sources.get(table).ok_or_else(|| ExecError::UnknownDataSource(table.to_string()))
    }

    /// Runs a correlated-free subquery end to end (lower, then execute)
    /// against this same context, for `Exists`/`InSubquery` predicates
    /// the semi-join rewrite left untouched (no unique key on the
    /// subquery's output, so it couldn't be turned into a join).
    pub fn execute_subquery(&self, plan: &LogicalPlan) -> ExecResult<Vec<Row>> {
        if self.cancellation.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        crate::execute_logical(plan, self).map(|result| result.rows)
    }
}
