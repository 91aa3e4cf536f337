//! Partition layered rules into evaluation groups.

use pulsar_lang::RuleFacts;

/// Per-group accumulation limits. Adding a rule that would push the group
/// past any of these closes the group and starts a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupLimits {
    pub max_rules: usize,
    pub max_condition_leaves: usize,
    pub max_actions: usize,
}

impl Default for GroupLimits {
    fn default() -> Self {
        Self {
            max_rules: 25,
            max_condition_leaves: 100,
            max_actions: 50,
        }
    }
}

/// An ordered run of rules sharing one layer, emitted as one evaluation
/// unit named `g_<index>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGroup {
    pub index: usize,
    pub layer: usize,
    /// Arena indices in emission order.
    pub rules: Vec<usize>,
}

/// Walk rules in (layer, parse rank) order and accumulate groups. A layer
/// boundary always closes the current group — a group never straddles two
/// layers — and the size limits close it early. A rule that alone exceeds
/// a limit still occupies a group of its own; rules are never split.
pub fn partition_groups(
    layers: &[usize],
    facts: &[RuleFacts],
    limits: &GroupLimits,
) -> Vec<RuleGroup> {
    debug_assert_eq!(layers.len(), facts.len());

    let mut order: Vec<usize> = (0..layers.len()).collect();
    order.sort_by_key(|&i| (layers[i], i));

    let mut groups: Vec<RuleGroup> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_layer = 0;
    let mut leaves = 0;
    let mut actions = 0;

    for &i in &order {
        let rule_leaves = facts[i].condition_leaves;
        let rule_actions = facts[i].action_count;
        let layer_break = !current.is_empty() && layers[i] != current_layer;
        let over_limit = !current.is_empty()
            && (current.len() + 1 > limits.max_rules
                || leaves + rule_leaves > limits.max_condition_leaves
                || actions + rule_actions > limits.max_actions);

        if layer_break || over_limit {
            groups.push(RuleGroup {
                index: groups.len(),
                layer: current_layer,
                rules: std::mem::take(&mut current),
            });
            leaves = 0;
            actions = 0;
        }

        if current.is_empty() {
            current_layer = layers[i];
        }
        current.push(i);
        leaves += rule_leaves;
        actions += rule_actions;
    }

    if !current.is_empty() {
        groups.push(RuleGroup {
            index: groups.len(),
            layer: current_layer,
            rules: current,
        });
    }

    groups
}
