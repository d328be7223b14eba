use common::value::Value;

use crate::logical::LogicalPlan;

/// A scalar expression evaluated against a row's column mapping. Shared
/// by predicates (Selection, Join conditions), projections and
/// aggregate arguments.
#[derive(Debug, Clone)]
pub enum Expr {
    Column(String),
    Literal(Value),
    BinaryOp { left: Box<Expr>, op: BinaryOperator, right: Box<Expr> },
    Not(Box<Expr>),
    Like { expr: Box<Expr>, pattern: Box<Expr>, negated: bool },
    In { expr: Box<Expr>, list: Vec<Expr>, negated: bool },
    Between { expr: Box<Expr>, low: Box<Expr>, high: Box<Expr>, negated: bool },
    IsNull { expr: Box<Expr>, negated: bool },
    Alias { expr: Box<Expr>, name: String },
    /// `expr IN (subquery)`, eligible for the semi-join rewrite once the
    /// subquery is uncorrelated and its output has a unique key.
    InSubquery { expr: Box<Expr>, subquery: Box<LogicalPlan>, negated: bool },
    /// `EXISTS (subquery)`, same rewrite eligibility as `InSubquery`.
    Exists { subquery: Box<LogicalPlan>, negated: bool },
}

/// Structural equality over everything but subqueries, which compare
/// unequal to any other subquery (including themselves) since
/// `LogicalPlan` carries no identity to compare by. Used by rules that
/// dedupe predicate lists; a false negative just means a predicate
/// survives as a harmless duplicate.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Column(a), Expr::Column(b)) => a == b,
            (Expr::Literal(a), Expr::Literal(b)) => a == b,
            (Expr::BinaryOp { left: al, op: ao, right: ar }, Expr::BinaryOp { left: bl, op: bo, right: br }) => ao == bo && al == bl && ar == br,
            (Expr::Not(a), Expr::Not(b)) => a == b,
            (Expr::Like { expr: ae, pattern: ap, negated: an }, Expr::Like { expr: be, pattern: bp, negated: bn }) => an == bn && ae == be && ap == bp,
            (Expr::In { expr: ae, list: al, negated: an }, Expr::In { expr: be, list: bl, negated: bn }) => an == bn && ae == be && al == bl,
            (Expr::Between { expr: ae, low: al, high: ah, negated: an }, Expr::Between { expr: be, low: bl, high: bh, negated: bn }) => {
                an == bn && ae == be && al == bl && ah == bh
            }
            (Expr::IsNull { expr: ae, negated: an }, Expr::IsNull { expr: be, negated: bn }) => an == bn && ae == be,
            (Expr::Alias { expr: ae, name: an }, Expr::Alias { expr: be, name: bn }) => an == bn && ae == be,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn literal(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    pub fn binary(self, op: BinaryOperator, other: Expr) -> Expr {
        Expr::BinaryOp { left: Box::new(self), op, right: Box::new(other) }
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias { expr: Box::new(self), name: name.into() }
    }

    /// The output name a projection gives this expression when no
    /// explicit alias is present: the referenced column's own name, or
    /// a synthesized name for anything else.
    pub fn output_name(&self) -> String {
        match self {
            Expr::Alias { name, .. } => name.clone(),
            Expr::Column(name) => name.clone(),
            other => format!("{other:?}"),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    /// Every column name this expression reads, for column-pruning and
    /// join-key discovery.
    pub fn referenced_columns(&self, out: &mut Vec<String>) {
        match self {
            Expr::Column(name) => out.push(name.clone()),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.referenced_columns(out);
                right.referenced_columns(out);
            }
            Expr::Not(inner) | Expr::Alias { expr: inner, .. } | Expr::IsNull { expr: inner, .. } => {
                inner.referenced_columns(out);
            }
            Expr::Like { expr, pattern, .. } => {
                expr.referenced_columns(out);
                pattern.referenced_columns(out);
            }
            Expr::In { expr, list, .. } => {
                expr.referenced_columns(out);
                for item in list {
                    item.referenced_columns(out);
                }
            }
            Expr::Between { expr, low, high, .. } => {
                expr.referenced_columns(out);
                low.referenced_columns(out);
                high.referenced_columns(out);
            }
            Expr::InSubquery { expr, .. } => expr.referenced_columns(out),
            Expr::Exists { .. } => {}
        }
    }

    /// Splits a conjunction into its top-level conjuncts, so rules can
    /// reason about individual predicates instead of a single blob.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::BinaryOp { left, op: BinaryOperator::And, right } => {
                let mut out = left.conjuncts();
                out.extend(right.conjuncts());
                out
            }
            other => vec![other],
        }
    }
}

/// Joins predicates with AND, or returns a literal `true` for an empty list.
pub fn conjunction(mut predicates: Vec<Expr>) -> Expr {
    let Some(mut acc) = predicates.pop() else {
        return Expr::Literal(Value::Bool(true));
    };
    while let Some(next) = predicates.pop() {
        acc = next.and(acc);
    }
    acc
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    CountStar,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub func: AggregateFunction,
    pub arg: Option<Expr>,
    pub output_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conjuncts_splits_an_and_chain() {
        let expr = Expr::column("a").eq(Expr::literal(Value::Int(1))).and(Expr::column("b").eq(Expr::literal(Value::Int(2))));
        assert_eq!(expr.conjuncts().len(), 2);
    }

    #[test]
    fn referenced_columns_collects_both_sides() {
        let expr = Expr::column("a").eq(Expr::column("b"));
        let mut cols = Vec::new();
        expr.referenced_columns(&mut cols);
        assert_eq!(cols, vec!["a".to_string(), "b".to_string()]);
    }
}
