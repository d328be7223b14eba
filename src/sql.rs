//! Translates SQL text into the planner's logical-plan algebra, or into a
//! small set of direct-dispatch statements (DML/DDL/transaction control)
//! the query engine applies straight against the catalog and backends.
//!
//! The SQL lexer/parser itself is an external collaborator this crate
//! does not own; this module is the glue between the `sqlparser` crate's
//! AST and the planner's own `Expr`/`LogicalPlan` shapes, covering the
//! subset of MySQL syntax a client actually needs to exercise a session
//! end to end. Constructs outside that subset surface as
//! `GatewayError::UnsupportedConstruct` rather than a panic.

use common::err::{CResult, GatewayError};
use common::schema::{Catalog, Column, ForeignKey, OnDelete, Table};
use common::value::{ColumnType, Value as GwValue};
use mvcc::IsolationLevel;
use planner::{AggregateExpr, AggregateFunction, BinaryOperator, Expr, JoinKind, LogicalPlan, OrderItem, UnionKind};
use sqlparser::ast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// One gateway-level statement translated from SQL text.
#[derive(Debug)]
pub enum Statement {
    Query(LogicalPlan),
    Insert { table: String, columns: Vec<String>, rows: Vec<Vec<GwValue>> },
    Update { table: String, assignments: Vec<(String, GwValue)>, selection: Option<Expr> },
    Delete { table: String, selection: Option<Expr> },
    Begin(IsolationLevel),
    Commit,
    Rollback,
    CreateTable(Table),
    DropTable { name: String, if_exists: bool },
}

/// Parses `sql` (which may hold several `;`-separated statements) and
/// translates each one, resolving table schemas against `catalog` as it
/// goes.
pub fn parse(sql: &str, catalog: &Catalog) -> CResult<Vec<Statement>> {
    let ast = Parser::parse_sql(&GenericDialect {}, sql).map_err(|e| GatewayError::UnsupportedConstruct(format!("SQL parse error: {e}")))?;
    ast.into_iter().map(|stmt| translate_statement(stmt, catalog)).collect()
}

fn translate_statement(stmt: ast::Statement, catalog: &Catalog) -> CResult<Statement> {
    match stmt {
        ast::Statement::Query(query) => Ok(Statement::Query(translate_query(&query, catalog)?)),
        ast::Statement::Insert(insert) => translate_insert(insert, catalog),
        ast::Statement::Update { table, assignments, selection, .. } => translate_update(table, assignments, selection, catalog),
        ast::Statement::Delete(delete) => translate_delete(delete, catalog),
        ast::Statement::StartTransaction { modes, .. } => {
            let isolation = modes
                .iter()
                .find_map(|mode| match mode {
                    ast::TransactionMode::IsolationLevel(level) => Some(translate_isolation(level)),
                    _ => None,
                })
                .unwrap_or(IsolationLevel::RepeatableRead);
            Ok(Statement::Begin(isolation))
        }
        ast::Statement::Commit { .. } => Ok(Statement::Commit),
        ast::Statement::Rollback { .. } => Ok(Statement::Rollback),
        ast::Statement::CreateTable(create) => translate_create_table(create),
        ast::Statement::Drop { object_type, if_exists, names, .. } => translate_drop(object_type, if_exists, names),
        other => Err(GatewayError::UnsupportedConstruct(format!("statement not supported: {other}"))),
    }
}

fn translate_isolation(level: &ast::TransactionIsolationLevel) -> IsolationLevel {
    match level {
        ast::TransactionIsolationLevel::ReadUncommitted => IsolationLevel::ReadUncommitted,
        ast::TransactionIsolationLevel::ReadCommitted => IsolationLevel::ReadCommitted,
        ast::TransactionIsolationLevel::RepeatableRead => IsolationLevel::RepeatableRead,
        ast::TransactionIsolationLevel::Serializable => IsolationLevel::Serializable,
    }
}

fn object_name(name: &ast::ObjectName) -> String {
    name.0.last().map(|ident| ident.value.clone()).unwrap_or_default()
}

fn table_factor_name(factor: &ast::TableFactor) -> CResult<String> {
    match factor {
        ast::TableFactor::Table { name, .. } => Ok(object_name(name)),
        other => Err(GatewayError::UnsupportedConstruct(format!("unsupported table reference: {other}"))),
    }
}

// ---------------------------------------------------------------- SELECT

pub fn translate_query(query: &ast::Query, catalog: &Catalog) -> CResult<LogicalPlan> {
    let mut plan = translate_set_expr(&query.body, catalog)?;

    if !query.order_by.is_empty() {
        let order = query
            .order_by
            .iter()
            .map(|item| Ok(OrderItem { expr: translate_expr(&item.expr, catalog)?, descending: item.asc == Some(false) }))
            .collect::<CResult<Vec<_>>>()?;
        plan = LogicalPlan::Sort { order, child: Box::new(plan) };
    }

    let limit = query.limit.as_ref().map(literal_usize).transpose()?;
    let offset = query.offset.as_ref().map(|o| literal_usize(&o.value)).transpose()?.unwrap_or(0);
    if let Some(limit) = limit {
        plan = LogicalPlan::Limit { limit, offset, child: Box::new(plan) };
    }
    Ok(plan)
}

fn translate_set_expr(set_expr: &ast::SetExpr, catalog: &Catalog) -> CResult<LogicalPlan> {
    match set_expr {
        ast::SetExpr::Select(select) => translate_select(select, catalog),
        ast::SetExpr::Query(query) => translate_query(query, catalog),
        ast::SetExpr::SetOperation { op: ast::SetOperator::Union, set_quantifier, left, right } => Ok(LogicalPlan::Union {
            kind: UnionKind::Select,
            all: matches!(set_quantifier, ast::SetQuantifier::All),
            children: vec![translate_set_expr(left, catalog)?, translate_set_expr(right, catalog)?],
        }),
        other => Err(GatewayError::UnsupportedConstruct(format!("unsupported query body: {other}"))),
    }
}

fn translate_table_factor(factor: &ast::TableFactor, catalog: &Catalog) -> CResult<LogicalPlan> {
    match factor {
        ast::TableFactor::Table { name, .. } => {
            let table_name = object_name(name);
            let schema = catalog.table(&table_name)?;
            Ok(LogicalPlan::data_source(table_name, schema))
        }
        ast::TableFactor::Derived { subquery, .. } => translate_query(subquery, catalog),
        other => Err(GatewayError::UnsupportedConstruct(format!("unsupported FROM item: {other}"))),
    }
}

fn translate_join_operator(op: &ast::JoinOperator, catalog: &Catalog) -> CResult<(JoinKind, Vec<Expr>)> {
    let (kind, constraint) = match op {
        ast::JoinOperator::Inner(c) => (JoinKind::Inner, c),
        ast::JoinOperator::LeftOuter(c) => (JoinKind::LeftOuter, c),
        ast::JoinOperator::RightOuter(c) => (JoinKind::RightOuter, c),
        ast::JoinOperator::FullOuter(c) => (JoinKind::FullOuter, c),
        other => return Err(GatewayError::UnsupportedConstruct(format!("unsupported join type: {other:?}"))),
    };
    let conditions = match constraint {
        ast::JoinConstraint::On(expr) => translate_expr(expr, catalog)?.conjuncts().into_iter().cloned().collect(),
        // A single-column join key is the common case; the translator
        // doesn't qualify USING columns by side, so both sides read the
        // same column name.
        ast::JoinConstraint::Using(idents) => idents.iter().map(|i| Expr::column(i.value.clone()).eq(Expr::column(i.value.clone()))).collect(),
        ast::JoinConstraint::Natural | ast::JoinConstraint::None => Vec::new(),
    };
    Ok((kind, conditions))
}

fn extract_aggregate(expr: &ast::Expr) -> Option<(AggregateFunction, Option<ast::Expr>)> {
    let ast::Expr::Function(func) = expr else { return None };
    let name = func.name.to_string().to_uppercase();
    let args = function_args(func);
    match name.as_str() {
        "COUNT" => {
            if args.first().is_some_and(is_wildcard_arg) {
                Some((AggregateFunction::CountStar, None))
            } else {
                args.first().and_then(|a| function_arg_expr(a)).map(|e| (AggregateFunction::Count, Some(e.clone())))
            }
        }
        "SUM" => args.first().and_then(|a| function_arg_expr(a)).map(|e| (AggregateFunction::Sum, Some(e.clone()))),
        "AVG" => args.first().and_then(|a| function_arg_expr(a)).map(|e| (AggregateFunction::Avg, Some(e.clone()))),
        "MIN" => args.first().and_then(|a| function_arg_expr(a)).map(|e| (AggregateFunction::Min, Some(e.clone()))),
        "MAX" => args.first().and_then(|a| function_arg_expr(a)).map(|e| (AggregateFunction::Max, Some(e.clone()))),
        _ => None,
    }
}

fn function_args(func: &ast::Function) -> Vec<&ast::FunctionArg> {
    match &func.args {
        ast::FunctionArguments::List(list) => list.args.iter().collect(),
        _ => Vec::new(),
    }
}

fn function_arg_expr(arg: &ast::FunctionArg) -> Option<&ast::Expr> {
    match arg {
        ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(e)) => Some(e),
        ast::FunctionArg::Named { arg: ast::FunctionArgExpr::Expr(e), .. } => Some(e),
        _ => None,
    }
}

fn is_wildcard_arg(arg: &&ast::FunctionArg) -> bool {
    matches!(arg, ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Wildcard))
}

fn translate_select(select: &ast::Select, catalog: &Catalog) -> CResult<LogicalPlan> {
    let mut from = select.from.iter();
    let first = from.next().ok_or_else(|| GatewayError::UnsupportedConstruct("SELECT requires a FROM clause".into()))?;
    let mut plan = translate_table_factor(&first.relation, catalog)?;
    for join in &first.joins {
        let right = translate_table_factor(&join.relation, catalog)?;
        let (kind, conditions) = translate_join_operator(&join.join_operator, catalog)?;
        plan = LogicalPlan::Join { kind, conditions, left: Box::new(plan), right: Box::new(right) };
    }
    if from.next().is_some() {
        return Err(GatewayError::UnsupportedConstruct("comma-joined FROM lists are not supported, use JOIN".into()));
    }

    if let Some(selection) = &select.selection {
        let predicate = translate_expr(selection, catalog)?;
        plan = LogicalPlan::Selection { predicates: predicate.conjuncts().into_iter().cloned().collect(), child: Box::new(plan) };
    }

    let group_by = match &select.group_by {
        ast::GroupByExpr::All(_) => Vec::new(),
        ast::GroupByExpr::Expressions(exprs, _) => exprs.iter().map(|e| translate_expr(e, catalog)).collect::<CResult<Vec<_>>>()?,
    };

    let has_aggregate = select.projection.iter().any(|item| match item {
        ast::SelectItem::UnnamedExpr(e) | ast::SelectItem::ExprWithAlias { expr: e, .. } => extract_aggregate(e).is_some(),
        _ => false,
    });

    if has_aggregate || !group_by.is_empty() {
        let mut aggregates = Vec::new();
        for item in &select.projection {
            let (expr, alias) = match item {
                ast::SelectItem::UnnamedExpr(e) => (e, None),
                ast::SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.clone())),
                _ => return Err(GatewayError::UnsupportedConstruct("wildcard projection cannot be combined with GROUP BY/aggregates".into())),
            };
            if let Some((func, arg)) = extract_aggregate(expr) {
                let arg = arg.map(|e| translate_expr(&e, catalog)).transpose()?;
                let output_name = alias.unwrap_or_else(|| format!("{func:?}").to_lowercase());
                aggregates.push(AggregateExpr { func, arg, output_name });
            }
            // A non-aggregate projection item is assumed to name a GROUP
            // BY column; it's already present in `group_by` and so in
            // the Aggregate node's own output, with no separate
            // Projection node needed on top.
        }
        plan = LogicalPlan::Aggregate { aggregates, group_by, child: Box::new(plan) };
        if let Some(having) = &select.having {
            let predicate = translate_expr(having, catalog)?;
            plan = LogicalPlan::Selection { predicates: predicate.conjuncts().into_iter().cloned().collect(), child: Box::new(plan) };
        }
        return Ok(plan);
    }

    let wildcard = select.projection.iter().any(|item| matches!(item, ast::SelectItem::Wildcard(_) | ast::SelectItem::QualifiedWildcard(..)));
    if !wildcard {
        let expressions = select
            .projection
            .iter()
            .map(|item| match item {
                ast::SelectItem::UnnamedExpr(e) => translate_expr(e, catalog),
                ast::SelectItem::ExprWithAlias { expr, alias } => Ok(translate_expr(expr, catalog)?.alias(alias.value.clone())),
                other => Err(GatewayError::UnsupportedConstruct(format!("unsupported projection item: {other}"))),
            })
            .collect::<CResult<Vec<_>>>()?;
        plan = LogicalPlan::Projection { expressions, child: Box::new(plan) };
    }
    Ok(plan)
}

fn literal_usize(expr: &ast::Expr) -> CResult<usize> {
    match expr {
        ast::Expr::Value(ast::Value::Number(s, _)) => s.parse().map_err(|_| GatewayError::UnsupportedConstruct(format!("invalid numeric literal: {s}"))),
        other => Err(GatewayError::UnsupportedConstruct(format!("LIMIT/OFFSET must be a literal integer, got {other}"))),
    }
}

// ------------------------------------------------------------- expressions

fn translate_expr(expr: &ast::Expr, catalog: &Catalog) -> CResult<Expr> {
    match expr {
        ast::Expr::Identifier(ident) => Ok(Expr::column(ident.value.clone())),
        ast::Expr::CompoundIdentifier(parts) => {
            let name = parts.last().map(|i| i.value.clone()).ok_or_else(|| GatewayError::UnsupportedConstruct("empty compound identifier".into()))?;
            Ok(Expr::column(name))
        }
        ast::Expr::Value(v) => Ok(Expr::literal(translate_value(v))),
        ast::Expr::Nested(inner) => translate_expr(inner, catalog),
        ast::Expr::UnaryOp { op: ast::UnaryOperator::Not, expr: inner } => Ok(Expr::Not(Box::new(translate_expr(inner, catalog)?))),
        ast::Expr::UnaryOp { op: ast::UnaryOperator::Minus, expr: inner } => match inner.as_ref() {
            ast::Expr::Value(ast::Value::Number(s, _)) => Ok(Expr::literal(negate_number(s))),
            _ => Err(GatewayError::UnsupportedConstruct("unary minus is only supported on numeric literals".into())),
        },
        ast::Expr::BinaryOp { left, op, right } => {
            let op = translate_binary_operator(op)?;
            Ok(Expr::BinaryOp { left: Box::new(translate_expr(left, catalog)?), op, right: Box::new(translate_expr(right, catalog)?) })
        }
        ast::Expr::IsNull(inner) => Ok(Expr::IsNull { expr: Box::new(translate_expr(inner, catalog)?), negated: false }),
        ast::Expr::IsNotNull(inner) => Ok(Expr::IsNull { expr: Box::new(translate_expr(inner, catalog)?), negated: true }),
        ast::Expr::Between { expr: inner, negated, low, high } => Ok(Expr::Between {
            expr: Box::new(translate_expr(inner, catalog)?),
            low: Box::new(translate_expr(low, catalog)?),
            high: Box::new(translate_expr(high, catalog)?),
            negated: *negated,
        }),
        ast::Expr::Like { negated, expr: inner, pattern, .. } => {
            Ok(Expr::Like { expr: Box::new(translate_expr(inner, catalog)?), pattern: Box::new(translate_expr(pattern, catalog)?), negated: *negated })
        }
        ast::Expr::InList { expr: inner, list, negated } => Ok(Expr::In {
            expr: Box::new(translate_expr(inner, catalog)?),
            list: list.iter().map(|e| translate_expr(e, catalog)).collect::<CResult<Vec<_>>>()?,
            negated: *negated,
        }),
        ast::Expr::InSubquery { expr: inner, subquery, negated } => {
            Ok(Expr::InSubquery { expr: Box::new(translate_expr(inner, catalog)?), subquery: Box::new(translate_query(subquery, catalog)?), negated: *negated })
        }
        ast::Expr::Exists { subquery, negated } => Ok(Expr::Exists { subquery: Box::new(translate_query(subquery, catalog)?), negated: *negated }),
        other => Err(GatewayError::UnsupportedConstruct(format!("unsupported expression: {other}"))),
    }
}

fn translate_binary_operator(op: &ast::BinaryOperator) -> CResult<BinaryOperator> {
    match op {
        ast::BinaryOperator::Eq => Ok(BinaryOperator::Eq),
        ast::BinaryOperator::NotEq => Ok(BinaryOperator::NotEq),
        ast::BinaryOperator::Lt => Ok(BinaryOperator::Lt),
        ast::BinaryOperator::LtEq => Ok(BinaryOperator::LtEq),
        ast::BinaryOperator::Gt => Ok(BinaryOperator::Gt),
        ast::BinaryOperator::GtEq => Ok(BinaryOperator::GtEq),
        ast::BinaryOperator::And => Ok(BinaryOperator::And),
        ast::BinaryOperator::Or => Ok(BinaryOperator::Or),
        other => Err(GatewayError::UnsupportedConstruct(format!("arithmetic operators are not supported: {other:?}"))),
    }
}

fn translate_value(v: &ast::Value) -> GwValue {
    match v {
        ast::Value::Number(s, _) => {
            if let Ok(i) = s.parse::<i64>() {
                GwValue::Int(i)
            } else if let Ok(f) = s.parse::<f64>() {
                GwValue::Double(f)
            } else {
                GwValue::Null
            }
        }
        ast::Value::SingleQuotedString(s) | ast::Value::DoubleQuotedString(s) => GwValue::String(s.clone()),
        ast::Value::Boolean(b) => GwValue::Bool(*b),
        ast::Value::Null => GwValue::Null,
        other => GwValue::String(other.to_string()),
    }
}

fn negate_number(s: &str) -> GwValue {
    if let Ok(i) = s.parse::<i64>() {
        GwValue::Int(-i)
    } else if let Ok(f) = s.parse::<f64>() {
        GwValue::Double(-f)
    } else {
        GwValue::Null
    }
}

fn literal_value(expr: &ast::Expr) -> CResult<GwValue> {
    match expr {
        ast::Expr::Value(v) => Ok(translate_value(v)),
        ast::Expr::UnaryOp { op: ast::UnaryOperator::Minus, expr } => match expr.as_ref() {
            ast::Expr::Value(ast::Value::Number(s, _)) => Ok(negate_number(s)),
            _ => Err(GatewayError::UnsupportedConstruct("value must be a literal".into())),
        },
        _ => Err(GatewayError::UnsupportedConstruct("value must be a literal".into())),
    }
}

// --------------------------------------------------------------------- DML

fn translate_insert(insert: ast::Insert, catalog: &Catalog) -> CResult<Statement> {
    let table = object_name(&insert.table_name);
    let columns: Vec<String> = if insert.columns.is_empty() {
        catalog.table(&table)?.column_names()
    } else {
        insert.columns.iter().map(|i| i.value.clone()).collect()
    };
    let source = insert.source.ok_or_else(|| GatewayError::UnsupportedConstruct("INSERT without VALUES is not supported".into()))?;
    let rows = match *source.body {
        ast::SetExpr::Values(values) => values.rows.iter().map(|row| row.iter().map(literal_value).collect::<CResult<Vec<_>>>()).collect::<CResult<Vec<_>>>()?,
        _ => return Err(GatewayError::UnsupportedConstruct("INSERT source must be a VALUES list".into())),
    };
    Ok(Statement::Insert { table, columns, rows })
}

fn translate_update(table: ast::TableWithJoins, assignments: Vec<ast::Assignment>, selection: Option<ast::Expr>, catalog: &Catalog) -> CResult<Statement> {
    let table_name = table_factor_name(&table.relation)?;
    let mut out = Vec::new();
    for assignment in assignments {
        let column = match &assignment.target {
            ast::AssignmentTarget::ColumnName(name) => object_name(name),
            ast::AssignmentTarget::Tuple(_) => return Err(GatewayError::UnsupportedConstruct("tuple assignment targets are not supported".into())),
        };
        let value = literal_value(&assignment.value)?;
        out.push((column, value));
    }
    let selection = selection.map(|e| translate_expr(&e, catalog)).transpose()?;
    Ok(Statement::Update { table: table_name, assignments: out, selection })
}

fn translate_delete(delete: ast::Delete, catalog: &Catalog) -> CResult<Statement> {
    let tables = match delete.from {
        ast::FromTable::WithFromKeyword(t) | ast::FromTable::WithoutKeyword(t) => t,
    };
    let first = tables.into_iter().next().ok_or_else(|| GatewayError::UnsupportedConstruct("DELETE requires a FROM table".into()))?;
    let table = table_factor_name(&first.relation)?;
    let selection = delete.selection.map(|e| translate_expr(&e, catalog)).transpose()?;
    Ok(Statement::Delete { table, selection })
}

// --------------------------------------------------------------------- DDL

fn translate_data_type(dt: &ast::DataType) -> ColumnType {
    match dt {
        ast::DataType::TinyInt(_) | ast::DataType::UnsignedTinyInt(_) => ColumnType::TinyInt,
        ast::DataType::SmallInt(_) | ast::DataType::UnsignedSmallInt(_) => ColumnType::SmallInt,
        ast::DataType::Int(_) | ast::DataType::Integer(_) | ast::DataType::MediumInt(_) => ColumnType::Int,
        ast::DataType::BigInt(_) | ast::DataType::UnsignedBigInt(_) => ColumnType::BigInt,
        ast::DataType::Float(_) => ColumnType::Float,
        ast::DataType::Double | ast::DataType::DoublePrecision => ColumnType::Double,
        ast::DataType::Decimal(_) | ast::DataType::Numeric(_) => ColumnType::Decimal,
        ast::DataType::Boolean | ast::DataType::Bool => ColumnType::Boolean,
        ast::DataType::Date => ColumnType::Date,
        ast::DataType::Time(_, _) => ColumnType::Time,
        ast::DataType::Datetime(_) => ColumnType::DateTime,
        ast::DataType::Timestamp(_, _) => ColumnType::Timestamp,
        ast::DataType::Text | ast::DataType::MediumText | ast::DataType::LongText => ColumnType::Text,
        ast::DataType::Blob(_) | ast::DataType::Varbinary(_) | ast::DataType::Binary(_) => ColumnType::Blob,
        ast::DataType::JSON => ColumnType::Json,
        _ => ColumnType::VarChar,
    }
}

fn translate_create_table(create: ast::CreateTable) -> CResult<Statement> {
    let name = object_name(&create.name);
    let mut columns = Vec::new();
    for col in &create.columns {
        let mut column = Column::new(col.name.value.clone(), translate_data_type(&col.data_type));
        for option_def in &col.options {
            match &option_def.option {
                ast::ColumnOption::NotNull => column = column.not_null(),
                ast::ColumnOption::Unique { is_primary: true, .. } => column = column.primary(),
                ast::ColumnOption::Unique { is_primary: false, .. } => column = column.unique(),
                ast::ColumnOption::Default(expr) => {
                    if let Ok(value) = literal_value(expr) {
                        column.default = Some(value.as_str_lossy());
                    }
                }
                ast::ColumnOption::ForeignKey { foreign_table, referenced_columns, on_delete, .. } => {
                    let referenced_column = referenced_columns.first().map(|i| i.value.clone()).unwrap_or_default();
                    let on_delete = match on_delete {
                        Some(ast::ReferentialAction::Cascade) => OnDelete::Cascade,
                        Some(ast::ReferentialAction::SetNull) => OnDelete::SetNull,
                        _ => OnDelete::Restrict,
                    };
                    column = column.with_foreign_key(ForeignKey { referenced_table: object_name(foreign_table), referenced_column, on_delete });
                }
                other => {
                    if other.to_string().to_uppercase().contains("AUTO_INCREMENT") {
                        column = column.auto_increment();
                    }
                }
            }
        }
        columns.push(column);
    }
    let table = Table::new(name, columns)?;
    Ok(Statement::CreateTable(table))
}

fn translate_drop(object_type: ast::ObjectType, if_exists: bool, names: Vec<ast::ObjectName>) -> CResult<Statement> {
    if object_type != ast::ObjectType::Table {
        return Err(GatewayError::UnsupportedConstruct("DROP only supports TABLE".into()));
    }
    let name = names.into_iter().next().ok_or_else(|| GatewayError::UnsupportedConstruct("DROP TABLE requires a table name".into()))?;
    Ok(Statement::DropTable { name: object_name(&name), if_exists })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with_widgets() -> Catalog {
        let catalog = Catalog::new("main");
        let columns = vec![Column::new("id", ColumnType::Int).primary(), Column::new("name", ColumnType::VarChar)];
        catalog.create_table(Table::new("widgets", columns).unwrap()).unwrap();
        catalog
    }

    #[test]
    fn translates_a_simple_select_into_projection_over_selection() {
        let catalog = catalog_with_widgets();
        let statements = parse("SELECT id, name FROM widgets WHERE id = 1", &catalog).unwrap();
        assert_eq!(statements.len(), 1);
        match &statements[0] {
            Statement::Query(LogicalPlan::Projection { child, .. }) => {
                assert!(matches!(**child, LogicalPlan::Selection { .. }));
            }
            other => panic!("expected a projection over a selection, got {other:?}"),
        }
    }

    #[test]
    fn translates_count_star_into_an_aggregate_node() {
        let catalog = catalog_with_widgets();
        let statements = parse("SELECT COUNT(*) FROM widgets", &catalog).unwrap();
        match &statements[0] {
            Statement::Query(LogicalPlan::Aggregate { aggregates, .. }) => {
                assert_eq!(aggregates.len(), 1);
                assert_eq!(aggregates[0].func, AggregateFunction::CountStar);
            }
            other => panic!("expected an aggregate plan, got {other:?}"),
        }
    }

    #[test]
    fn translates_insert_values_into_rows() {
        let catalog = catalog_with_widgets();
        let statements = parse("INSERT INTO widgets (id, name) VALUES (1, 'a')", &catalog).unwrap();
        match &statements[0] {
            Statement::Insert { table, columns, rows } => {
                assert_eq!(table, "widgets");
                assert_eq!(columns, &vec!["id".to_string(), "name".to_string()]);
                assert_eq!(rows.len(), 1);
            }
            other => panic!("expected an insert statement, got {other:?}"),
        }
    }

    #[test]
    fn translates_begin_commit_rollback() {
        let catalog = catalog_with_widgets();
        assert!(matches!(parse("BEGIN", &catalog).unwrap()[0], Statement::Begin(IsolationLevel::RepeatableRead)));
        assert!(matches!(parse("COMMIT", &catalog).unwrap()[0], Statement::Commit));
        assert!(matches!(parse("ROLLBACK", &catalog).unwrap()[0], Statement::Rollback));
    }

    #[test]
    fn rejects_arithmetic_in_a_where_clause() {
        let catalog = catalog_with_widgets();
        assert!(parse("SELECT id FROM widgets WHERE id + 1 = 2", &catalog).is_err());
    }
}
