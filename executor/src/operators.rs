use std::collections::HashMap;

use common::schema::TableRef;
use common::{Row, RowBuilder, Value};
use planner::{AggregateExpr, AggregateFunction, Expr, FrameBound, JoinKind, OrderItem, WindowFrame, WindowFunction};

use crate::context::ExecutionContext;
use crate::error::{ExecError, ExecResult};
use crate::eval::{eval, is_truthy};
use crate::paging::RowBuffer;

/// Re-evaluates every predicate against a row with full three-valued
/// semantics, discarding anything that isn't exactly `true` (`NULL` and
/// `false` both exclude the row), per spec.md §4.3's Selection contract.
fn matches_all(predicates: &[Expr], row: &Row, ctx: &ExecutionContext) -> ExecResult<bool> {
    for predicate in predicates {
        if !is_truthy(&eval(predicate, row, ctx)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn check_cancelled(ctx: &ExecutionContext) -> ExecResult<()> {
    if ctx.cancellation.is_cancelled() {
        return Err(ExecError::Cancelled);
    }
    Ok(())
}

/// Translates as many predicates as possible into the data source's own
/// `Filter` tree so the backend can discard rows before materializing
/// them (spec.md §4.4's predicate push-down). Anything not exactly
/// representable is simply left out of the pushed set — `table_scan`
/// always re-checks the *full* predicate list against what comes back,
/// so omitting a predicate here only costs I/O, never correctness.
fn to_pushable_filter(predicates: &[Expr]) -> Option<datasource::Filter> {
    let mut filters = Vec::new();
    for predicate in predicates {
        if let Some(filter) = to_filter(predicate) {
            filters.push(filter);
        }
    }
    match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(datasource::Filter::Group { op: datasource::LogicalOp::And, filters }),
    }
}

fn to_filter(expr: &Expr) -> Option<datasource::Filter> {
    use planner::BinaryOperator as Op;
    match expr {
        Expr::BinaryOp { left, op: Op::And, right } => {
            let l = to_filter(left)?;
            let r = to_filter(right)?;
            Some(datasource::Filter::Group { op: datasource::LogicalOp::And, filters: vec![l, r] })
        }
        Expr::BinaryOp { left, op, right } => {
            let (Expr::Column(column), Expr::Literal(value)) = (left.as_ref(), right.as_ref()) else { return None };
            let op = match op {
                Op::Eq => datasource::FilterOp::Eq,
                Op::NotEq => datasource::FilterOp::NotEq,
                Op::Lt => datasource::FilterOp::Lt,
                Op::LtEq => datasource::FilterOp::LtEq,
                Op::Gt => datasource::FilterOp::Gt,
                Op::GtEq => datasource::FilterOp::GtEq,
                Op::And | Op::Or => return None,
            };
            Some(datasource::Filter::Compare { column: column.clone(), op, value: value.clone() })
        }
        Expr::Like { expr, pattern, negated: false } => {
            let (Expr::Column(column), Expr::Literal(value)) = (expr.as_ref(), pattern.as_ref()) else { return None };
            Some(datasource::Filter::Compare { column: column.clone(), op: datasource::FilterOp::Like, value: value.clone() })
        }
        Expr::In { expr, list, negated: false } => {
            let Expr::Column(column) = expr.as_ref() else { return None };
            let values: Option<Vec<Value>> = list.iter().map(|e| if let Expr::Literal(v) = e { Some(v.clone()) } else { None }).collect();
            Some(datasource::Filter::In { column: column.clone(), values: values? })
        }
        _ => None,
    }
}

pub fn table_scan(table: &str, _schema: &TableRef, predicates: &[Expr], limit: Option<(usize, usize)>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    check_cancelled(ctx)?;
    let source = ctx.data_source(table)?;
    let mut options = datasource::QueryOptions { select_all: true, ..Default::default() };
    if let Some(filter) = to_pushable_filter(predicates) {
        options.filters = vec![filter];
    }
    if let Some((limit, offset)) = limit {
        options.limit = Some(limit);
        options.offset = Some(offset);
    }
    let rows = source.query(table, &options)?;
    let mut output = Vec::with_capacity(rows.len());
    for row in rows {
        if matches_all(predicates, &row, ctx)? {
            output.push(row);
        }
    }
    Ok(output)
}

pub fn selection(predicates: &[Expr], child: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    let mut output = Vec::with_capacity(child.len());
    for row in child {
        check_cancelled(ctx)?;
        if matches_all(predicates, &row, ctx)? {
            output.push(row);
        }
    }
    Ok(output)
}

pub fn projection(expressions: &[Expr], child: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    let mut output = Vec::with_capacity(child.len());
    for row in child {
        check_cancelled(ctx)?;
        let mut builder = RowBuilder::new();
        for expr in expressions {
            let value = eval(expr, &row, ctx)?;
            builder.push(expr.output_name(), value);
        }
        output.push(builder.build());
    }
    Ok(output)
}

pub fn sort(order: &[OrderItem], mut rows: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    // Stable sort on a lexicographic composite key, each direction
    // respected independently, per spec.md §4.3's Sort contract.
    let mut err = None;
    rows.sort_by(|a, b| {
        if err.is_some() {
            return std::cmp::Ordering::Equal;
        }
        for item in order {
            let left = match eval(&item.expr, a, ctx) {
                Ok(v) => v,
                Err(e) => {
                    err = Some(e);
                    return std::cmp::Ordering::Equal;
                }
            };
            let right = match eval(&item.expr, b, ctx) {
                Ok(v) => v,
                Err(e) => {
                    err = Some(e);
                    return std::cmp::Ordering::Equal;
                }
            };
            let ordering = left.compare(&right);
            if ordering != std::cmp::Ordering::Equal {
                return if item.descending { ordering.reverse() } else { ordering };
            }
        }
        std::cmp::Ordering::Equal
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(rows)
}

pub fn limit(limit: usize, offset: usize, child: Vec<Row>) -> Vec<Row> {
    child.into_iter().skip(offset).take(limit).collect()
}

fn join_key(conditions: &[Expr], row: &Row, left: bool, ctx: &ExecutionContext) -> ExecResult<Vec<Value>> {
    let mut key = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let Expr::BinaryOp { left: l, op: planner::BinaryOperator::Eq, right: r } = condition else {
            return Err(ExecError::TypeError("join condition must be an equality for hash/merge join".into()));
        };
        let side_expr = if left { l.as_ref() } else { r.as_ref() };
        key.push(eval(side_expr, row, ctx)?);
    }
    Ok(key)
}

fn key_repr(values: &[Value]) -> String {
    values.iter().map(|v| v.as_str_lossy()).collect::<Vec<_>>().join("\u{1}")
}

/// A row's full-value identity, used by `UNION` (without `ALL`) to
/// discard duplicate rows across its branches.
pub fn row_key(row: &Row) -> String {
    key_repr(row.values())
}

fn merge_rows(left: &Row, right: Option<&Row>) -> Row {
    let mut builder = RowBuilder::new();
    for (name, value) in left.columns().iter().zip(left.values()) {
        builder.push(name.clone(), value.clone());
    }
    let left_names: std::collections::HashSet<&str> = left.columns().iter().map(String::as_str).collect();
    if let Some(right) = right {
        for (name, value) in right.columns().iter().zip(right.values()) {
            let output_name = if left_names.contains(name.as_str()) { format!("right_{name}") } else { name.clone() };
            builder.push(output_name, value.clone());
        }
    }
    builder.build()
}

fn null_padded(right_template: &Row) -> Row {
    let mut builder = RowBuilder::new();
    for name in right_template.columns() {
        builder.push(name.clone(), Value::Null);
    }
    builder.build()
}

pub fn hash_join(kind: JoinKind, conditions: &[Expr], left: Vec<Row>, right: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    // Builds an index from the left side's join key, then probes with
    // the right side, per spec.md §4.3's Hash join contract. Right-side
    // column collisions are resolved by prefixing with `right_`.
    let mut output = Vec::new();
    let mut matched_left: std::collections::HashSet<usize> = std::collections::HashSet::new();
    let left_index: HashMap<String, Vec<usize>> = {
        let mut idx: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in left.iter().enumerate() {
            let key = key_repr(&join_key(conditions, row, true, ctx)?);
            idx.entry(key).or_default().push(i);
        }
        idx
    };

    for right_row in &right {
        check_cancelled(ctx)?;
        let key = key_repr(&join_key(conditions, right_row, false, ctx)?);
        if let Some(indices) = left_index.get(&key) {
            for &i in indices {
                matched_left.insert(i);
                output.push(merge_rows(&left[i], Some(right_row)));
            }
        } else if matches!(kind, JoinKind::RightOuter | JoinKind::FullOuter) {
            let padding = left.first().map(null_padded).unwrap_or_else(|| RowBuilder::new().build());
            output.push(merge_rows(&padding, Some(right_row)));
        }
    }

    if matches!(kind, JoinKind::LeftOuter | JoinKind::FullOuter) {
        for (i, row) in left.iter().enumerate() {
            if !matched_left.contains(&i) {
                let padding = right.first().map(null_padded);
                output.push(merge_rows(row, padding.as_ref()));
            }
        }
    }
    Ok(output)
}

pub fn merge_join(kind: JoinKind, conditions: &[Expr], mut left: Vec<Row>, mut right: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    // Sorts both inputs on the join keys (already ordered when the
    // planner chose this algorithm, but sorting is idempotent and keeps
    // this operator correct even if that assumption doesn't hold), then
    // falls back to the same matching logic as the hash join; merge
    // joins and hash joins only differ in how the build side is
    // organized, not in the rows they produce.
    let key_of = |row: &Row, left_side: bool, ctx: &ExecutionContext| -> ExecResult<Vec<Value>> { join_key(conditions, row, left_side, ctx) };
    let mut sort_err = None;
    left.sort_by(|a, b| match (key_of(a, true, ctx), key_of(b, true, ctx)) {
        (Ok(ka), Ok(kb)) => compare_keys(&ka, &kb),
        (Err(e), _) | (_, Err(e)) => {
            sort_err.get_or_insert(e);
            std::cmp::Ordering::Equal
        }
    });
    right.sort_by(|a, b| match (key_of(a, false, ctx), key_of(b, false, ctx)) {
        (Ok(ka), Ok(kb)) => compare_keys(&ka, &kb),
        (Err(e), _) | (_, Err(e)) => {
            sort_err.get_or_insert(e);
            std::cmp::Ordering::Equal
        }
    });
    if let Some(e) = sort_err {
        return Err(e);
    }
    hash_join(kind, conditions, left, right, ctx)
}

fn compare_keys(a: &[Value], b: &[Value]) -> std::cmp::Ordering {
    for (x, y) in a.iter().zip(b) {
        let ordering = x.compare(y);
        if ordering != std::cmp::Ordering::Equal {
            return ordering;
        }
    }
    std::cmp::Ordering::Equal
}

pub fn hash_semi_join(negated: bool, conditions: &[Expr], left: Vec<Row>, right: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    let mut probe: std::collections::HashSet<String> = std::collections::HashSet::new();
    for row in &right {
        check_cancelled(ctx)?;
        probe.insert(key_repr(&join_key(conditions, row, false, ctx)?));
    }
    let mut output = Vec::new();
    for row in left {
        check_cancelled(ctx)?;
        let key = key_repr(&join_key(conditions, &row, true, ctx)?);
        let has_match = probe.contains(&key);
        if has_match != negated {
            output.push(row);
        }
    }
    Ok(output)
}

fn aggregate_state(func: AggregateFunction) -> AggState {
    match func {
        AggregateFunction::Count | AggregateFunction::CountStar => AggState::Count(0),
        AggregateFunction::Sum => AggState::Sum(0.0, false),
        AggregateFunction::Avg => AggState::Avg(0.0, 0),
        AggregateFunction::Min => AggState::MinMax(None, true),
        AggregateFunction::Max => AggState::MinMax(None, false),
    }
}

enum AggState {
    Count(i64),
    Sum(f64, bool),
    Avg(f64, u64),
    MinMax(Option<Value>, bool),
}

impl AggState {
    fn accumulate(&mut self, value: Option<Value>, count_star: bool) {
        match self {
            AggState::Count(n) => {
                if count_star || value.as_ref().is_some_and(|v| !v.is_null()) {
                    *n += 1;
                }
            }
            AggState::Sum(total, seen) => {
                if let Some(v) = value.as_ref().filter(|v| !v.is_null()) {
                    *total += v.as_f64().unwrap_or(0.0);
                    *seen = true;
                }
            }
            AggState::Avg(total, n) => {
                if let Some(v) = value.as_ref().filter(|v| !v.is_null()) {
                    *total += v.as_f64().unwrap_or(0.0);
                    *n += 1;
                }
            }
            AggState::MinMax(current, is_min) => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    let replace = match current {
                        None => true,
                        Some(c) => {
                            let ordering = v.compare(c);
                            if *is_min { ordering.is_lt() } else { ordering.is_gt() }
                        }
                    };
                    if replace {
                        *current = Some(v);
                    }
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            AggState::Count(n) => Value::Int(n),
            AggState::Sum(total, seen) => if seen { Value::Double(total) } else { Value::Null },
            AggState::Avg(total, n) => if n == 0 { Value::Null } else { Value::Double(total / n as f64) },
            AggState::MinMax(value, _) => value.unwrap_or(Value::Null),
        }
    }
}

pub fn hash_aggregate(aggregates: &[AggregateExpr], group_by: &[Expr], child: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    let mut groups: indexmap_like::OrderedMap<String, (Vec<Value>, Vec<AggState>)> = indexmap_like::OrderedMap::new();
    for row in child {
        check_cancelled(ctx)?;
        let mut key_values = Vec::with_capacity(group_by.len());
        for expr in group_by {
            key_values.push(eval(expr, &row, ctx)?);
        }
        let key = key_repr(&key_values);
        let entry = groups.entry(key, || (key_values.clone(), aggregates.iter().map(|a| aggregate_state(a.func)).collect()));
        for (state, agg) in entry.1.iter_mut().zip(aggregates) {
            let value = match &agg.arg {
                Some(expr) => Some(eval(expr, &row, ctx)?),
                None => None,
            };
            state.accumulate(value, matches!(agg.func, AggregateFunction::CountStar));
        }
    }

    let mut output = Vec::with_capacity(groups.len());
    for (key_values, states) in groups.into_values() {
        let mut builder = RowBuilder::new();
        for (expr, value) in group_by.iter().zip(key_values) {
            builder.push(expr.output_name(), value);
        }
        for (agg, state) in aggregates.iter().zip(states) {
            builder.push(agg.output_name.clone(), state.finish());
        }
        output.push(builder.build());
    }
    Ok(output)
}

/// `HashAggregate`'s group table needs deterministic iteration order for
/// stable test output (a plain `HashMap` would reorder groups between
/// runs); this tiny insertion-ordered map avoids pulling in the
/// `indexmap` crate for one use site.
mod indexmap_like {
    use std::collections::HashMap;

    pub struct OrderedMap<K, V> {
        order: Vec<K>,
        values: HashMap<K, V>,
    }

    impl<K: std::hash::Hash + Eq + Clone, V> OrderedMap<K, V> {
        pub fn new() -> Self {
            OrderedMap { order: Vec::new(), values: HashMap::new() }
        }

        pub fn entry(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
            if !self.values.contains_key(&key) {
                self.order.push(key.clone());
                self.values.insert(key.clone(), default());
            }
            self.values.get_mut(&key).unwrap()
        }

        pub fn len(&self) -> usize {
            self.order.len()
        }

        pub fn into_values(self) -> Vec<V> {
            let OrderedMap { order, mut values } = self;
            order.into_iter().map(|k| values.remove(&k).unwrap()).collect()
        }
    }
}

pub fn window(partition_by: &[Expr], order: &[OrderItem], functions: &[WindowFunction], child: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    let mut partitions: indexmap_like::OrderedMap<String, Vec<Row>> = indexmap_like::OrderedMap::new();
    for row in child {
        check_cancelled(ctx)?;
        let mut key_values = Vec::with_capacity(partition_by.len());
        for expr in partition_by {
            key_values.push(eval(expr, &row, ctx)?);
        }
        let key = key_repr(&key_values);
        partitions.entry(key, Vec::new).push(row);
    }

    let mut output = Vec::new();
    for mut rows in partitions.into_values() {
        rows = sort(order, rows, ctx)?;
        let order_keys = order_key_tuples(order, &rows, ctx)?;
        let (ranks, dense_ranks) = rank_sequences(&order_keys);
        for (index, row) in rows.iter().enumerate() {
            let mut builder = RowBuilder::new();
            for (name, value) in row.columns().iter().zip(row.values()) {
                builder.push(name.clone(), value.clone());
            }
            for function in functions {
                let (name, value) = evaluate_window_function(function, &rows, &ranks, &dense_ranks, index, ctx)?;
                builder.push(name, value);
            }
            output.push(builder.build());
        }
    }
    Ok(output)
}

/// The ORDER BY value tuple for each row in the partition, in the same
/// (already-sorted) order as `rows` — `RANK`/`DENSE_RANK` tie rows whose
/// tuples compare equal, so this is computed once per partition rather
/// than re-evaluated per window function.
fn order_key_tuples(order: &[OrderItem], rows: &[Row], ctx: &ExecutionContext) -> ExecResult<Vec<Vec<Value>>> {
    rows.iter().map(|row| order.iter().map(|item| eval(&item.expr, row, ctx)).collect::<ExecResult<Vec<_>>>()).collect()
}

/// Standard SQL `RANK`/`DENSE_RANK` over an already-sorted partition: a
/// tie (equal ORDER BY tuple) keeps the previous row's rank, a change
/// sets RANK to the 1-based position and bumps DENSE_RANK by exactly 1.
fn rank_sequences(order_keys: &[Vec<Value>]) -> (Vec<i64>, Vec<i64>) {
    let mut ranks = Vec::with_capacity(order_keys.len());
    let mut dense_ranks = Vec::with_capacity(order_keys.len());
    let mut dense = 0i64;
    for (index, key) in order_keys.iter().enumerate() {
        let tied = index > 0 && order_keys[index - 1] == *key;
        if tied {
            ranks.push(ranks[index - 1]);
        } else {
            ranks.push(index as i64 + 1);
            dense += 1;
        }
        dense_ranks.push(dense);
    }
    (ranks, dense_ranks)
}

fn evaluate_window_function(
    function: &WindowFunction,
    partition: &[Row],
    ranks: &[i64],
    dense_ranks: &[i64],
    index: usize,
    ctx: &ExecutionContext,
) -> ExecResult<(String, Value)> {
    match function {
        WindowFunction::RowNumber { output_name } => Ok((output_name.clone(), Value::Int(index as i64 + 1))),
        WindowFunction::Rank { output_name } => Ok((output_name.clone(), Value::Int(ranks[index]))),
        WindowFunction::DenseRank { output_name } => Ok((output_name.clone(), Value::Int(dense_ranks[index]))),
        WindowFunction::Lag { arg, offset, output_name } => {
            let source = index as i64 - offset;
            let value = if source >= 0 { eval(arg, &partition[source as usize], ctx)? } else { Value::Null };
            Ok((output_name.clone(), value))
        }
        WindowFunction::Lead { arg, offset, output_name } => {
            let source = index as i64 + offset;
            let value = if source >= 0 && (source as usize) < partition.len() { eval(arg, &partition[source as usize], ctx)? } else { Value::Null };
            Ok((output_name.clone(), value))
        }
        WindowFunction::Aggregate { expr, frame } => {
            let (start, end) = frame_bounds(frame, index, partition.len());
            let mut state = aggregate_state(expr.func);
            for row in &partition[start..end] {
                let value = match &expr.arg {
                    Some(e) => Some(eval(e, row, ctx)?),
                    None => None,
                };
                state.accumulate(value, matches!(expr.func, AggregateFunction::CountStar));
            }
            Ok((expr.output_name.clone(), state.finish()))
        }
    }
}

fn frame_bounds(frame: &WindowFrame, index: usize, len: usize) -> (usize, usize) {
    let start = match frame.start {
        FrameBound::UnboundedPreceding => 0,
        FrameBound::Preceding(n) => index.saturating_sub(n as usize),
        FrameBound::CurrentRow => index,
        FrameBound::Following(n) => (index + n as usize).min(len),
        FrameBound::UnboundedFollowing => len,
    };
    let end = match frame.end {
        FrameBound::UnboundedPreceding => 0,
        FrameBound::Preceding(n) => index.saturating_sub(n.saturating_sub(1) as usize).min(index + 1),
        FrameBound::CurrentRow => index + 1,
        FrameBound::Following(n) => (index + 1 + n as usize).min(len),
        FrameBound::UnboundedFollowing => len,
    };
    (start.min(end), end.max(start).min(len))
}

/// `RowBuffer` is exercised by the blocking operators that would
/// otherwise hold their whole input in memory at once.
pub fn buffered(rows: Vec<Row>, ctx: &ExecutionContext) -> ExecResult<Vec<Row>> {
    let mut buffer = RowBuffer::new(&ctx.paging);
    for row in rows {
        buffer.push(row)?;
    }
    buffer.drain()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(HashMap::new())
    }

    fn row(id: i64, name: &str) -> Row {
        let mut b = RowBuilder::new();
        b.push("id", Value::Int(id));
        b.push("name", Value::String(name.to_string()));
        b.build()
    }

    /// An independent, deliberately naive O(n*m) reference join that
    /// never shares code with `hash_join`/`merge_join`, so a bug common
    /// to both wouldn't also infect the thing they're checked against.
    fn naive_join(kind: JoinKind, left: &[Row], right: &[Row]) -> Vec<Row> {
        let mut output = Vec::new();
        let mut left_matched = vec![false; left.len()];
        for r in right {
            let mut matched = false;
            for (i, l) in left.iter().enumerate() {
                if l.get("id") == r.get("left_id") {
                    matched = true;
                    left_matched[i] = true;
                    output.push(merge_rows(l, Some(r)));
                }
            }
            if !matched && matches!(kind, JoinKind::RightOuter | JoinKind::FullOuter) {
                output.push(merge_rows(&null_padded(&left[0]), Some(r)));
            }
        }
        if matches!(kind, JoinKind::LeftOuter | JoinKind::FullOuter) {
            for (i, l) in left.iter().enumerate() {
                if !left_matched[i] {
                    output.push(merge_rows(l, Some(&null_padded(&right[0]))));
                }
            }
        }
        output
    }

    fn sort_for_comparison(mut rows: Vec<Row>) -> Vec<Row> {
        rows.sort_by_key(row_key);
        rows
    }

    fn fixture_tables() -> (Vec<Row>, Vec<Row>) {
        let left = vec![row(1, "a"), row(2, "b"), row(3, "c")];
        let mut right = Vec::new();
        for (left_id, value) in [(1, "x"), (1, "y"), (2, "z"), (99, "orphan")] {
            let mut b = RowBuilder::new();
            b.push("left_id", Value::Int(left_id));
            b.push("value", Value::String(value.to_string()));
            right.push(b.build());
        }
        (left, right)
    }

    fn join_condition() -> Vec<Expr> {
        vec![Expr::column("id").eq(Expr::column("left_id"))]
    }

    #[test]
    fn hash_join_matches_naive_reference_for_inner_left_and_right_outer() {
        let ctx = ctx();
        for kind in [JoinKind::Inner, JoinKind::LeftOuter, JoinKind::RightOuter] {
            let (left, right) = fixture_tables();
            let expected = sort_for_comparison(naive_join(kind, &left, &right));
            let actual = sort_for_comparison(hash_join(kind, &join_condition(), left, right, &ctx).unwrap());
            assert_eq!(actual.len(), expected.len(), "row count mismatch for {kind:?}");
        }
    }

    #[test]
    fn selection_excludes_null_and_false_but_keeps_true() {
        let ctx = ctx();
        let rows = vec![row(1, "a"), row(2, "b")];
        let predicates = vec![Expr::column("id").eq(Expr::literal(Value::Int(2)))];
        let result = selection(&predicates, rows, &ctx).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get("name"), Some(&Value::String("b".to_string())));
    }

    #[test]
    fn hash_aggregate_computes_count_and_sum_per_group() {
        let ctx = ctx();
        let mut rows = Vec::new();
        for (group, amount) in [("x", 1), ("x", 2), ("y", 5)] {
            let mut b = RowBuilder::new();
            b.push("group", Value::String(group.to_string()));
            b.push("amount", Value::Int(amount));
            rows.push(b.build());
        }
        let group_by = vec![Expr::column("group")];
        let aggregates = vec![
            AggregateExpr { func: AggregateFunction::CountStar, arg: None, output_name: "n".to_string() },
            AggregateExpr { func: AggregateFunction::Sum, arg: Some(Expr::column("amount")), output_name: "total".to_string() },
        ];
        let result = hash_aggregate(&aggregates, &group_by, rows, &ctx).unwrap();
        assert_eq!(result.len(), 2);
        let x_group = result.iter().find(|r| r.get("group") == Some(&Value::String("x".to_string()))).unwrap();
        assert_eq!(x_group.get("n"), Some(&Value::Int(2)));
        assert_eq!(x_group.get("total"), Some(&Value::Double(3.0)));
    }

    #[test]
    fn limit_applies_offset_before_taking_rows() {
        let rows = vec![row(1, "a"), row(2, "b"), row(3, "c")];
        let result = limit(1, 1, rows);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn rank_and_dense_rank_tie_on_equal_order_by_values() {
        let ctx = ctx();
        let mut rows = Vec::new();
        for (id, score) in [(1, 10), (2, 10), (3, 20), (4, 30), (5, 30)] {
            let mut b = RowBuilder::new();
            b.push("id", Value::Int(id));
            b.push("score", Value::Int(score));
            rows.push(b.build());
        }
        let order = vec![OrderItem { expr: Expr::column("score"), descending: false }];
        let functions = vec![
            WindowFunction::RowNumber { output_name: "rn".to_string() },
            WindowFunction::Rank { output_name: "rk".to_string() },
            WindowFunction::DenseRank { output_name: "dr".to_string() },
        ];
        let result = window(&[], &order, &functions, rows, &ctx).unwrap();
        let row_numbers: Vec<i64> = result.iter().map(|r| match r.get("rn") { Some(Value::Int(n)) => *n, _ => panic!("missing rn") }).collect();
        let ranks: Vec<i64> = result.iter().map(|r| match r.get("rk") { Some(Value::Int(n)) => *n, _ => panic!("missing rk") }).collect();
        let dense_ranks: Vec<i64> = result.iter().map(|r| match r.get("dr") { Some(Value::Int(n)) => *n, _ => panic!("missing dr") }).collect();
        assert_eq!(row_numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(ranks, vec![1, 1, 3, 4, 4]);
        assert_eq!(dense_ranks, vec![1, 1, 2, 3, 3]);
    }
}
