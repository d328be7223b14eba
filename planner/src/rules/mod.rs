mod column_pruning;
mod constant_folding;
mod join_elimination;
mod join_reorder;
mod limit_pushdown;
mod predicate_pushdown;
mod projection_elimination;
mod semi_join_rewrite;

use crate::logical::LogicalPlan;
use crate::stats::StatsProvider;

/// Every rewrite rule returns the (possibly unchanged) tree plus
/// whether it actually changed anything, since owned `LogicalPlan`
/// trees have no stable identity to fixpoint-compare by pointer.
pub type RuleResult = (LogicalPlan, bool);

pub trait Rule {
    fn name(&self) -> &'static str;
    fn apply(&self, plan: LogicalPlan, stats: &StatsProvider) -> RuleResult;
}

pub fn rule_set() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(predicate_pushdown::PredicatePushdown),
        Box::new(constant_folding::ConstantFolding),
        Box::new(join_elimination::JoinElimination),
        Box::new(join_reorder::JoinReorder),
        Box::new(semi_join_rewrite::SemiJoinRewrite),
        Box::new(column_pruning::ColumnPruning),
        Box::new(projection_elimination::ProjectionElimination),
        Box::new(limit_pushdown::LimitPushdown),
    ]
}

/// Applies a rule to the root, then recursively to every child; a
/// child change re-triggers the parent by letting the caller's own
/// fixpoint loop run the rule again next pass.
pub fn apply_recursively(rule: &dyn Rule, plan: LogicalPlan, stats: &StatsProvider) -> RuleResult {
    let (plan, root_changed) = rule.apply(plan, stats);
    let (plan, children_changed) = rewrite_children(rule, plan, stats);
    (plan, root_changed || children_changed)
}

fn rewrite_children(rule: &dyn Rule, plan: LogicalPlan, stats: &StatsProvider) -> RuleResult {
    match plan {
        LogicalPlan::Selection { predicates, child } => {
            let (child, changed) = apply_recursively(rule, *child, stats);
            (LogicalPlan::Selection { predicates, child: Box::new(child) }, changed)
        }
        LogicalPlan::Projection { expressions, child } => {
            let (child, changed) = apply_recursively(rule, *child, stats);
            (LogicalPlan::Projection { expressions, child: Box::new(child) }, changed)
        }
        LogicalPlan::Sort { order, child } => {
            let (child, changed) = apply_recursively(rule, *child, stats);
            (LogicalPlan::Sort { order, child: Box::new(child) }, changed)
        }
        LogicalPlan::Limit { limit, offset, child } => {
            let (child, changed) = apply_recursively(rule, *child, stats);
            (LogicalPlan::Limit { limit, offset, child: Box::new(child) }, changed)
        }
        LogicalPlan::Aggregate { aggregates, group_by, child } => {
            let (child, changed) = apply_recursively(rule, *child, stats);
            (LogicalPlan::Aggregate { aggregates, group_by, child: Box::new(child) }, changed)
        }
        LogicalPlan::Join { kind, conditions, left, right } => {
            let (left, left_changed) = apply_recursively(rule, *left, stats);
            let (right, right_changed) = apply_recursively(rule, *right, stats);
            (LogicalPlan::Join { kind, conditions, left: Box::new(left), right: Box::new(right) }, left_changed || right_changed)
        }
        LogicalPlan::SemiJoin { negated, conditions, left, right } => {
            let (left, left_changed) = apply_recursively(rule, *left, stats);
            let (right, right_changed) = apply_recursively(rule, *right, stats);
            (LogicalPlan::SemiJoin { negated, conditions, left: Box::new(left), right: Box::new(right) }, left_changed || right_changed)
        }
        LogicalPlan::Union { kind, all, children } => {
            let mut changed = false;
            let mut rewritten = Vec::with_capacity(children.len());
            for child in children {
                let (child, child_changed) = apply_recursively(rule, child, stats);
                changed |= child_changed;
                rewritten.push(child);
            }
            (LogicalPlan::Union { kind, all, children: rewritten }, changed)
        }
        leaf @ (LogicalPlan::DataSource { .. } | LogicalPlan::Empty { .. }) => (leaf, false),
    }
}
