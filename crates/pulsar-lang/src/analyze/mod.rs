mod sensors;


use std::collections::BTreeSet;

use crate::ast::*;

/// Analysis-derived facts for one rule. Computed once after validation and
/// treated as frozen from then on; the dependency graph, grouping, and
/// emission all read from here instead of re-walking the AST.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleFacts {
    /// `input:` (and unprefixed) sensors read by conditions, plus
    /// `input:`-prefixed sensors referenced by action expressions.
    pub input_sensors: BTreeSet<String>,
    /// Keys written by `set_value` actions.
    pub output_sensors: BTreeSet<String>,
    /// Every sensor read anywhere in the rule (conditions and action
    /// expressions, any prefix). Dependency edges are derived from this set.
    pub read_sensors: BTreeSet<String>,
    /// Sensors read through a `threshold_over_time` condition.
    pub temporal_sensors: BTreeSet<String>,
    pub temporal: bool,
    pub complexity: u32,
    pub condition_leaves: usize,
    pub action_count: usize,
    /// The sensor `$input` resolves to: the first declared input binding,
    /// else the lexicographically smallest input sensor.
    pub canonical_input: Option<String>,
}

/// Compute the full fact set for one rule.
pub fn analyze_rule(rule: &Rule) -> RuleFacts {
    let mut facts = RuleFacts::default();

    sensors::collect_condition_sensors(&rule.condition, &mut facts);
    for action in rule.actions.iter().chain(rule.else_actions.iter()) {
        sensors::collect_action_sensors(action, &mut facts);
        if let Some(key) = action.set_key() {
            facts.output_sensors.insert(key.to_string());
        }
    }

    facts.temporal = rule.condition.is_temporal();
    facts.condition_leaves = rule.condition.leaf_count();
    facts.action_count = rule.actions.len() + rule.else_actions.len();
    facts.complexity = complexity_score(rule, &facts);
    facts.canonical_input = rule
        .inputs
        .first()
        .map(|binding| binding.sensor.clone())
        .or_else(|| facts.input_sensors.iter().next().cloned());

    facts
}

/// Advisory complexity: base 1, +1 per additional leaf, +2 per temporal
/// threshold, plus the referenced-sensor count of each expression leaf.
fn complexity_score(rule: &Rule, facts: &RuleFacts) -> u32 {
    let mut score = 1;
    score += facts.condition_leaves.saturating_sub(1) as u32;
    score += expression_weight(&rule.condition);
    score
}

fn expression_weight(tree: &ConditionTree) -> u32 {
    match tree {
        ConditionTree::Group { all, any } => {
            all.iter().chain(any.iter()).map(expression_weight).sum()
        }
        ConditionTree::TemporalThreshold { .. } => 2,
        ConditionTree::Expression { expr, .. } => {
            let mut sensors = Vec::new();
            expr.sensors(&mut sensors);
            sensors.len() as u32
        }
        ConditionTree::Comparison { .. } => 0,
    }
}
