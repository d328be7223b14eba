//! The query engine that sits behind the wire-protocol crate: owns the
//! catalog, the backend registry, the MVCC transaction layer and the
//! planner/executor pipeline, and answers every [`connection::QueryEngine`]
//! call a session makes.

pub mod sql;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use common::err::{CResult, GatewayError};
use common::schema::{Catalog, Table};
use common::value::{ColumnType, Value};
use common::{Row, RowBuilder};
use connection::engine::{ColumnDescriptor, PreparedDescriptor, QueryEngine, QueryOutcome};
use connection::session::Session;
use datasource::{DataSource, Filter, LogicalOp, QueryOptions};
use mvcc::{IsolationLevel, TransactionId, TransactionalDataSource};
use planner::{BinaryOperator, Expr, LogicalPlan, StatsProvider};

use sql::Statement;

/// A transaction's state as tracked by the gateway itself — per-session,
/// not per-connection-crate [`Session`] — since [`Session`] only tracks
/// whether a transaction is open via its status flags, not which MVCC
/// transaction id backs it.
struct SessionTxn {
    isolation: IsolationLevel,
    /// One sub-transaction per physical backend this session's
    /// transaction has touched so far, begun lazily on first use.
    /// The gateway does not attempt two-phase commit across backends:
    /// COMMIT applies each backend's sub-transaction independently, in
    /// backend-registration order, and a failure partway through leaves
    /// earlier backends committed — acceptable because spec.md scopes
    /// distributed transactions out, and a single-backend deployment
    /// (the common case) is unaffected either way.
    backend_txns: HashMap<String, TransactionId>,
}

/// Where a catalog table's rows actually live.
struct TableBinding {
    backend_name: String,
    source: Arc<TransactionalDataSource>,
}

/// Implements [`QueryEngine`] atop the planner/executor/datasource/mvcc
/// stack, translating SQL text with [`sql::parse`] and running the
/// resulting plans against whichever physical backends own the tables
/// involved.
pub struct GatewayEngine {
    catalog: Arc<Catalog>,
    bindings: RwLock<HashMap<String, TableBinding>>,
    default_backend: String,
    stats: StatsProvider,
    paging: executor::paging::PagingConfig,
    txns: Mutex<HashMap<u32, SessionTxn>>,
    /// The gateway has no plan cache, so a prepared statement is just
    /// its original SQL text kept around for `execute_prepared` to
    /// re-parse with parameters substituted in. `PreparedDescriptor`
    /// itself only describes the statement's shape, not its text.
    prepared_sql: Mutex<HashMap<(u32, u32), String>>,
}

impl GatewayEngine {
    pub fn new(catalog: Arc<Catalog>, default_backend: impl Into<String>, paging: executor::paging::PagingConfig) -> Self {
        GatewayEngine {
            catalog,
            bindings: RwLock::new(HashMap::new()),
            default_backend: default_backend.into(),
            stats: StatsProvider::new(),
            paging,
            txns: Mutex::new(HashMap::new()),
            prepared_sql: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a physical backend and binds every table already
    /// present in the catalog under `backend_name` to it. Tables created
    /// later via `CREATE TABLE` are bound to `default_backend` (see
    /// `register_default_backend`).
    pub fn register_backend(&self, backend_name: impl Into<String>, source: Arc<TransactionalDataSource>) -> CResult<()> {
        let backend_name = backend_name.into();
        let mut bindings = self.bindings.write().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
        for table in self.catalog.table_names()? {
            bindings.entry(table).or_insert_with(|| TableBinding { backend_name: backend_name.clone(), source: source.clone() });
        }
        Ok(())
    }

    fn binding(&self, table: &str) -> CResult<Arc<TransactionalDataSource>> {
        let bindings = self.bindings.read().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
        bindings.get(table).map(|b| b.source.clone()).ok_or_else(|| GatewayError::UnknownTable(table.to_string()))
    }

    fn backend_name_for(&self, table: &str) -> CResult<String> {
        let bindings = self.bindings.read().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
        bindings.get(table).map(|b| b.backend_name.clone()).ok_or_else(|| GatewayError::UnknownTable(table.to_string()))
    }

    fn bind_new_table(&self, table: &str) -> CResult<()> {
        let source = {
            let bindings = self.bindings.read().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
            bindings.values().find(|b| b.backend_name == self.default_backend).map(|b| b.source.clone())
        };
        let source = source.ok_or_else(|| GatewayError::Configuration(format!("no backend registered as default ('{}')", self.default_backend)))?;
        let mut bindings = self.bindings.write().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
        bindings.insert(table.to_string(), TableBinding { backend_name: self.default_backend.clone(), source });
        Ok(())
    }

    /// The MVCC transaction id backing `table` for this session, lazily
    /// beginning a sub-transaction on the owning backend the first time
    /// the session touches it.
    fn txn_for_table(&self, session_id: u32, table: &str) -> CResult<Option<(TransactionId, IsolationLevel)>> {
        let backend_name = self.backend_name_for(table)?;
        let source = self.binding(table)?;
        let mut txns = self.txns.lock().map_err(|_| GatewayError::Execution("transaction table lock poisoned".into()))?;
        let Some(state) = txns.get_mut(&session_id) else { return Ok(None) };
        let isolation = state.isolation;
        let id = *state.backend_txns.entry(backend_name).or_insert_with(|| source.begin(isolation));
        Ok(Some((id, isolation)))
    }

    fn build_context(&self, session_id: u32, tables: &[String]) -> CResult<executor::ExecutionContext> {
        let mut data_sources: HashMap<String, Arc<dyn DataSource>> = HashMap::new();
        for table in tables {
            let source = self.binding(table)?;
            let txn = self.txn_for_table(session_id, table)?;
            data_sources.insert(table.clone(), Arc::new(source.scoped(txn)) as Arc<dyn DataSource>);
        }
        Ok(executor::ExecutionContext::new(data_sources).with_stats(self.stats.clone()).with_paging(self.paging.clone()))
    }

    fn begin(&self, session: &mut Session, isolation: IsolationLevel) -> CResult<()> {
        let mut txns = self.txns.lock().map_err(|_| GatewayError::Execution("transaction table lock poisoned".into()))?;
        txns.insert(session.id, SessionTxn { isolation, backend_txns: HashMap::new() });
        session.begin_transaction();
        Ok(())
    }

    fn commit(&self, session: &mut Session) -> CResult<()> {
        let state = {
            let mut txns = self.txns.lock().map_err(|_| GatewayError::Execution("transaction table lock poisoned".into()))?;
            txns.remove(&session.id)
        };
        session.end_transaction();
        let Some(state) = state else { return Ok(()) };
        for (backend_name, id) in state.backend_txns {
            let source = {
                let bindings = self.bindings.read().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
                bindings.values().find(|b| b.backend_name == backend_name).map(|b| b.source.clone())
            };
            if let Some(source) = source {
                source.commit(id)?;
            }
        }
        Ok(())
    }

    fn rollback(&self, session: &mut Session) -> CResult<()> {
        let state = {
            let mut txns = self.txns.lock().map_err(|_| GatewayError::Execution("transaction table lock poisoned".into()))?;
            txns.remove(&session.id)
        };
        session.end_transaction();
        let Some(state) = state else { return Ok(()) };
        for (backend_name, id) in state.backend_txns {
            let source = {
                let bindings = self.bindings.read().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
                bindings.values().find(|b| b.backend_name == backend_name).map(|b| b.source.clone())
            };
            if let Some(source) = source {
                source.abort(id)?;
            }
        }
        Ok(())
    }

    fn run_statement(&self, session: &mut Session, statement: Statement) -> CResult<QueryOutcome> {
        match statement {
            Statement::Query(plan) => {
                let tables = referenced_tables(&plan);
                let ctx = self.build_context(session.id, &tables)?;
                let optimized = planner::optimize(plan, &self.stats);
                let result = executor::execute_logical(&optimized, &ctx)?;
                let columns = describe_columns(&result.columns, &result.rows);
                Ok(QueryOutcome::Rows { columns, rows: result.rows })
            }
            Statement::Insert { table, columns, rows } => {
                let ctx = self.build_context(session.id, std::slice::from_ref(&table))?;
                let source = ctx.data_source(&table)?.clone();
                let mut affected = 0u64;
                let mut last_insert_id = 0u64;
                let schema = self.catalog.table(&table)?;
                for values in rows {
                    let mut builder = RowBuilder::new();
                    for (name, value) in columns.iter().zip(values.into_iter()) {
                        builder.push(name.clone(), value);
                    }
                    let inserted = source.insert(&table, builder.build())?;
                    if let Some(auto_col) = schema.auto_increment_column() {
                        if let Some(Value::Int(id)) = inserted.get(&auto_col.name) {
                            last_insert_id = *id as u64;
                        }
                    }
                    affected += 1;
                }
                Ok(QueryOutcome::Affected { rows_affected: affected, last_insert_id, warnings: 0 })
            }
            Statement::Update { table, assignments, selection } => {
                let ctx = self.build_context(session.id, std::slice::from_ref(&table))?;
                let source = ctx.data_source(&table)?.clone();
                let filters = selection.map(|e| predicate_to_filters(&e)).transpose()?.unwrap_or_default();
                let options = QueryOptions { select_all: true, filters, ..Default::default() };
                let changes: Vec<(String, Value)> = assignments;
                let affected = source.update(&table, &options, &changes)?;
                Ok(QueryOutcome::Affected { rows_affected: affected, last_insert_id: 0, warnings: 0 })
            }
            Statement::Delete { table, selection } => {
                let ctx = self.build_context(session.id, std::slice::from_ref(&table))?;
                let source = ctx.data_source(&table)?.clone();
                let filters = selection.map(|e| predicate_to_filters(&e)).transpose()?.unwrap_or_default();
                let options = QueryOptions { select_all: true, filters, ..Default::default() };
                let affected = source.delete(&table, &options)?;
                Ok(QueryOutcome::Affected { rows_affected: affected, last_insert_id: 0, warnings: 0 })
            }
            Statement::Begin(isolation) => {
                self.begin(session, isolation)?;
                Ok(QueryOutcome::Affected { rows_affected: 0, last_insert_id: 0, warnings: 0 })
            }
            Statement::Commit => {
                self.commit(session)?;
                Ok(QueryOutcome::Affected { rows_affected: 0, last_insert_id: 0, warnings: 0 })
            }
            Statement::Rollback => {
                self.rollback(session)?;
                Ok(QueryOutcome::Affected { rows_affected: 0, last_insert_id: 0, warnings: 0 })
            }
            Statement::CreateTable(table) => {
                let name = table.name.clone();
                let source = {
                    let bindings = self.bindings.read().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
                    bindings.values().find(|b| b.backend_name == self.default_backend).map(|b| b.source.clone())
                };
                let source = source.ok_or_else(|| GatewayError::Configuration(format!("no backend registered as default ('{}')", self.default_backend)))?;
                source.scoped(None).create_table(table.clone())?;
                self.catalog.create_table(table)?;
                self.bind_new_table(&name)?;
                Ok(QueryOutcome::Affected { rows_affected: 0, last_insert_id: 0, warnings: 0 })
            }
            Statement::DropTable { name, if_exists } => {
                match self.binding(&name) {
                    Ok(source) => {
                        source.scoped(None).drop_table(&name)?;
                        self.catalog.drop_table(&name)?;
                        let mut bindings = self.bindings.write().map_err(|_| GatewayError::Execution("binding table lock poisoned".into()))?;
                        bindings.remove(&name);
                    }
                    Err(_) if if_exists => {}
                    Err(e) => return Err(e),
                }
                Ok(QueryOutcome::Affected { rows_affected: 0, last_insert_id: 0, warnings: 0 })
            }
        }
    }
}

impl QueryEngine for GatewayEngine {
    fn execute_query(&self, session: &mut Session, sql: &str) -> CResult<Vec<QueryOutcome>> {
        let statements = sql::parse(sql, &self.catalog)?;
        statements.into_iter().map(|stmt| self.run_statement(session, stmt)).collect()
    }

    fn prepare(&self, session: &mut Session, sql: &str) -> CResult<PreparedDescriptor> {
        let param_count = count_placeholders(sql) as u16;
        let probe_sql = substitute_params(sql, &vec![Value::Null; param_count as usize]);
        let statements = sql::parse(&probe_sql, &self.catalog)?;
        let columns = match statements.into_iter().next() {
            Some(Statement::Query(plan)) => plan.output_schema().into_iter().map(|name| ColumnDescriptor::new(name, ColumnType::VarChar)).collect(),
            _ => Vec::new(),
        };
        let statement_id = session.reserve_statement_id();
        let descriptor = PreparedDescriptor { statement_id, param_count, column_count: columns.len() as u16, columns };
        session.register_prepared(descriptor.clone());
        let mut prepared_sql = self.prepared_sql.lock().map_err(|_| GatewayError::Execution("prepared statement table lock poisoned".into()))?;
        prepared_sql.insert((session.id, statement_id), sql.to_string());
        Ok(descriptor)
    }

    fn execute_prepared(&self, session: &mut Session, stmt_id: u32, params: &[Value]) -> CResult<QueryOutcome> {
        let sql = {
            let prepared_sql = self.prepared_sql.lock().map_err(|_| GatewayError::Execution("prepared statement table lock poisoned".into()))?;
            prepared_sql.get(&(session.id, stmt_id)).cloned()
        };
        let sql = sql.ok_or_else(|| GatewayError::Execution(format!("unknown prepared statement {stmt_id}")))?;
        let bound_sql = substitute_params(&sql, params);
        let statements = sql::parse(&bound_sql, &self.catalog)?;
        let statement = statements.into_iter().next().ok_or_else(|| GatewayError::Execution("prepared statement had no body".into()))?;
        self.run_statement(session, statement)
    }

    fn close_prepared(&self, session: &mut Session, stmt_id: u32) {
        session.forget_prepared(stmt_id);
        if let Ok(mut prepared_sql) = self.prepared_sql.lock() {
            prepared_sql.remove(&(session.id, stmt_id));
        }
    }

    fn use_database(&self, session: &mut Session, name: &str) -> CResult<()> {
        session.current_database = Some(name.to_string());
        Ok(())
    }
}

fn referenced_tables(plan: &LogicalPlan) -> Vec<String> {
    let mut out = Vec::new();
    collect_tables(plan, &mut out);
    out
}

fn collect_tables(plan: &LogicalPlan, out: &mut Vec<String>) {
    match plan {
        LogicalPlan::DataSource { table, .. } => out.push(table.clone()),
        LogicalPlan::Selection { child, .. } | LogicalPlan::Projection { child, .. } | LogicalPlan::Sort { child, .. } | LogicalPlan::Limit { child, .. } | LogicalPlan::Aggregate { child, .. } => {
            collect_tables(child, out)
        }
        LogicalPlan::Join { left, right, .. } | LogicalPlan::SemiJoin { left, right, .. } => {
            collect_tables(left, out);
            collect_tables(right, out);
        }
        LogicalPlan::Union { children, .. } => {
            for child in children {
                collect_tables(child, out);
            }
        }
        LogicalPlan::Empty { .. } => {}
    }
}

/// Best-effort column typing for a result set: the planner doesn't carry
/// static types end to end, so the wire-visible type is taken from the
/// first non-null value seen in each column, falling back to `VarChar`
/// for an all-null or empty result.
fn describe_columns(names: &[String], rows: &[Row]) -> Vec<ColumnDescriptor> {
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let column_type = rows
                .iter()
                .filter_map(|row| row.values().get(idx))
                .find(|v| !v.is_null())
                .map(value_column_type)
                .unwrap_or(ColumnType::VarChar);
            ColumnDescriptor::new(name.clone(), column_type)
        })
        .collect()
}

fn value_column_type(value: &Value) -> ColumnType {
    match value {
        Value::Null => ColumnType::Null,
        Value::Int(_) => ColumnType::BigInt,
        Value::Double(_) => ColumnType::Double,
        Value::String(_) => ColumnType::VarChar,
        Value::Bool(_) => ColumnType::Boolean,
        Value::DateTime(_) => ColumnType::DateTime,
        Value::Blob(_) => ColumnType::Blob,
    }
}

/// Translates a WHERE clause into the data source's pushdown `Filter`
/// tree, the same shape `executor::operators` builds for predicate
/// push-down on SELECT. UPDATE/DELETE need this translation to succeed
/// outright rather than degrading gracefully, since an unrepresentable
/// predicate here would otherwise mean "match every row" instead of
/// "match no extra rows" — so anything outside the representable subset
/// (OR, NOT, BETWEEN, IS NULL, negated LIKE/IN) is rejected rather than
/// silently dropped.
fn predicate_to_filters(expr: &Expr) -> CResult<Vec<Filter>> {
    expr.conjuncts().into_iter().map(predicate_to_filter).collect()
}

fn predicate_to_filter(expr: &Expr) -> CResult<Filter> {
    match expr {
        Expr::BinaryOp { left, op: BinaryOperator::And, right } => {
            Ok(Filter::Group { op: LogicalOp::And, filters: vec![predicate_to_filter(left)?, predicate_to_filter(right)?] })
        }
        Expr::BinaryOp { left, op: BinaryOperator::Or, right } => {
            Ok(Filter::Group { op: LogicalOp::Or, filters: vec![predicate_to_filter(left)?, predicate_to_filter(right)?] })
        }
        Expr::BinaryOp { left, op, right } => {
            let (Expr::Column(column), Expr::Literal(value)) = (left.as_ref(), right.as_ref()) else {
                return Err(GatewayError::UnsupportedConstruct("comparisons must be column-against-literal".into()));
            };
            let op = match op {
                BinaryOperator::Eq => datasource::FilterOp::Eq,
                BinaryOperator::NotEq => datasource::FilterOp::NotEq,
                BinaryOperator::Lt => datasource::FilterOp::Lt,
                BinaryOperator::LtEq => datasource::FilterOp::LtEq,
                BinaryOperator::Gt => datasource::FilterOp::Gt,
                BinaryOperator::GtEq => datasource::FilterOp::GtEq,
                BinaryOperator::And | BinaryOperator::Or => unreachable!("handled above"),
            };
            Ok(Filter::Compare { column: column.clone(), op, value: value.clone() })
        }
        Expr::Like { expr, pattern, negated: false } => {
            let (Expr::Column(column), Expr::Literal(value)) = (expr.as_ref(), pattern.as_ref()) else {
                return Err(GatewayError::UnsupportedConstruct("LIKE must compare a column against a literal".into()));
            };
            Ok(Filter::Compare { column: column.clone(), op: datasource::FilterOp::Like, value: value.clone() })
        }
        Expr::In { expr, list, negated: false } => {
            let Expr::Column(column) = expr.as_ref() else {
                return Err(GatewayError::UnsupportedConstruct("IN must test a column".into()));
            };
            let values = list
                .iter()
                .map(|e| match e {
                    Expr::Literal(v) => Ok(v.clone()),
                    _ => Err(GatewayError::UnsupportedConstruct("IN list must be literals".into())),
                })
                .collect::<CResult<Vec<_>>>()?;
            Ok(Filter::In { column: column.clone(), values })
        }
        other => Err(GatewayError::UnsupportedConstruct(format!("predicate not supported in UPDATE/DELETE: {other:?}"))),
    }
}

fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut in_string = false;
    for ch in sql.chars() {
        match ch {
            '\'' => in_string = !in_string,
            '?' if !in_string => count += 1,
            _ => {}
        }
    }
    count
}

/// Renders each `?` placeholder as a SQL literal so the bound statement
/// can be re-parsed with an off-the-shelf parser that has no concept of
/// bind parameters of its own.
fn substitute_params(sql: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_string = false;
    let mut param_idx = 0;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                out.push(ch);
            }
            '?' if !in_string => {
                if let Some(value) = params.get(param_idx) {
                    out.push_str(&render_literal(value));
                }
                param_idx += 1;
            }
            _ => out.push(ch),
        }
    }
    out
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Double(f) => f.to_string(),
        Value::Bool(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::DateTime(ts) => format!("'{ts}'"),
        Value::Blob(bytes) => format!("'{}'", hex::encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::schema::Column;
    use common::value::ColumnType;
    use datasource::memory::MemoryDataSource;
    use mvcc::{DefaultDowngrader, TransactionManager};

    use super::*;

    fn engine_with_widgets() -> GatewayEngine {
        let catalog = Arc::new(Catalog::new("main"));
        let columns = vec![Column::new("id", ColumnType::Int).primary().auto_increment(), Column::new("name", ColumnType::VarChar)];
        catalog.create_table(Table::new("widgets", columns).unwrap()).unwrap();

        let memory = MemoryDataSource::new();
        memory.connect().unwrap();
        let columns = vec![Column::new("id", ColumnType::Int).primary().auto_increment(), Column::new("name", ColumnType::VarChar)];
        memory.create_table(Table::new("widgets", columns).unwrap()).unwrap();

        let manager = Arc::new(TransactionManager::new(1000));
        let source = Arc::new(TransactionalDataSource::new("memory", Arc::new(memory), manager, Arc::new(DefaultDowngrader)));

        let engine = GatewayEngine::new(catalog, "memory", executor::paging::PagingConfig::default());
        engine.register_backend("memory", source).unwrap();
        engine
    }

    #[test]
    fn insert_then_select_round_trips_a_row() {
        let engine = engine_with_widgets();
        let mut session = Session::new(1);
        engine.execute_query(&mut session, "INSERT INTO widgets (id, name) VALUES (1, 'gizmo')").unwrap();
        let outcomes = engine.execute_query(&mut session, "SELECT id, name FROM widgets WHERE id = 1").unwrap();
        match &outcomes[0] {
            QueryOutcome::Rows { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].get("name").cloned(), Some(Value::String("gizmo".into())));
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn update_is_invisible_until_commit() {
        let engine = engine_with_widgets();
        let mut session = Session::new(1);
        engine.execute_query(&mut session, "INSERT INTO widgets (id, name) VALUES (1, 'gizmo')").unwrap();
        engine.execute_query(&mut session, "BEGIN").unwrap();
        engine.execute_query(&mut session, "UPDATE widgets SET name = 'updated' WHERE id = 1").unwrap();

        let mut other_session = Session::new(2);
        let outcomes = engine.execute_query(&mut other_session, "SELECT name FROM widgets WHERE id = 1").unwrap();
        match &outcomes[0] {
            QueryOutcome::Rows { rows, .. } => assert_eq!(rows[0].get("name").cloned(), Some(Value::String("gizmo".into()))),
            other => panic!("expected rows, got {other:?}"),
        }

        engine.execute_query(&mut session, "COMMIT").unwrap();
        let outcomes = engine.execute_query(&mut other_session, "SELECT name FROM widgets WHERE id = 1").unwrap();
        match &outcomes[0] {
            QueryOutcome::Rows { rows, .. } => assert_eq!(rows[0].get("name").cloned(), Some(Value::String("updated".into()))),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn delete_with_an_unsupported_predicate_is_rejected_rather_than_matching_everything() {
        let engine = engine_with_widgets();
        let mut session = Session::new(1);
        engine.execute_query(&mut session, "INSERT INTO widgets (id, name) VALUES (1, 'a')").unwrap();
        let result = engine.execute_query(&mut session, "DELETE FROM widgets WHERE name IS NULL");
        assert!(result.is_err());
    }
}
