//! Per-rule structural checks.

use std::collections::BTreeSet;

use crate::analyze::analyze_rule;
use crate::ast::*;

use super::{ValidationError, ValidationOutcome, ValidationWarning};

pub(super) fn check_rule(rule: &Rule, outcome: &mut ValidationOutcome) {
    let name = if rule.name.trim().is_empty() {
        outcome.errors.push(ValidationError {
            code: "V001",
            rule: None,
            message: format!(
                "{}:{}: rule has an empty name",
                rule.provenance.file, rule.provenance.line
            ),
        });
        None
    } else {
        Some(rule.name.clone())
    };
    let error = |code, message: String| ValidationError {
        code,
        rule: name.clone(),
        message,
    };

    if rule.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
        outcome.warnings.push(ValidationWarning {
            code: "W001",
            rule: name.clone(),
            message: "rule has no description".to_string(),
        });
    }

    if rule.condition.leaf_count() == 0 {
        outcome
            .errors
            .push(error("V002", "rule has no conditions".to_string()));
    }
    if rule.actions.is_empty() {
        outcome
            .errors
            .push(error("V003", "rule has no actions".to_string()));
    }

    check_condition(&rule.condition, &name, outcome);
    for action in rule.actions.iter().chain(rule.else_actions.iter()) {
        check_action(action, &name, outcome);
    }
    check_bindings(rule, &name, outcome);
}

fn check_condition(tree: &ConditionTree, rule: &Option<String>, outcome: &mut ValidationOutcome) {
    let error = |code, message: String| ValidationError {
        code,
        rule: rule.clone(),
        message,
    };
    match tree {
        ConditionTree::Group { all, any } => {
            for child in all.iter().chain(any.iter()) {
                check_condition(child, rule, outcome);
            }
        }
        ConditionTree::Comparison { sensor, .. } => {
            if sensor.trim().is_empty() {
                outcome
                    .errors
                    .push(error("V004", "comparison has an empty sensor".to_string()));
            }
        }
        ConditionTree::TemporalThreshold {
            sensor,
            duration_ms,
            ..
        } => {
            if sensor.trim().is_empty() {
                outcome.errors.push(error(
                    "V004",
                    "temporal condition has an empty sensor".to_string(),
                ));
            }
            if *duration_ms == 0 {
                outcome.errors.push(error(
                    "V005",
                    "temporal condition has a non-positive duration".to_string(),
                ));
            }
        }
        ConditionTree::Expression { source, expr } => {
            let mut sensors = Vec::new();
            expr.sensors(&mut sensors);
            if sensors.is_empty() {
                outcome.warnings.push(ValidationWarning {
                    code: "W002",
                    rule: rule.clone(),
                    message: format!("expression `{source}` references no sensors"),
                });
            }
        }
    }
}

fn check_action(action: &Action, rule: &Option<String>, outcome: &mut ValidationOutcome) {
    let error = |code, message: String| ValidationError {
        code,
        rule: rule.clone(),
        message,
    };
    match action {
        Action::Set { key, value, expr, .. } => {
            if key.trim().is_empty() {
                outcome
                    .errors
                    .push(error("V006", "set_value has an empty key".to_string()));
            }
            if value.is_none() && expr.is_none() {
                outcome.errors.push(error(
                    "V007",
                    "set_value needs a `value` or a `value_expression`".to_string(),
                ));
            }
        }
        Action::SendMessage {
            channel,
            message,
            expr,
            ..
        } => {
            if channel.trim().is_empty() {
                outcome
                    .errors
                    .push(error("V008", "send_message has an empty channel".to_string()));
            }
            let message_empty = message.as_deref().is_none_or(|m| m.trim().is_empty());
            if message_empty && expr.is_none() {
                outcome.errors.push(error(
                    "V009",
                    "send_message needs a `message` or a `message_expression`".to_string(),
                ));
            }
        }
        Action::Buffer { key, .. } => {
            if key.trim().is_empty() {
                outcome
                    .errors
                    .push(error("V010", "buffer has an empty key".to_string()));
            }
        }
        Action::Log { message, .. } => {
            if message.trim().is_empty() {
                outcome
                    .errors
                    .push(error("V011", "log has an empty message".to_string()));
            }
        }
    }
}

/// An input binding for a sensor the rule never reads has no effect.
fn check_bindings(rule: &Rule, name: &Option<String>, outcome: &mut ValidationOutcome) {
    if rule.inputs.is_empty() {
        return;
    }
    let facts = analyze_rule(rule);
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for binding in &rule.inputs {
        if !seen.insert(binding.sensor.as_str()) {
            outcome.errors.push(ValidationError {
                code: "V012",
                rule: name.clone(),
                message: format!("duplicate input binding for `{}`", binding.sensor),
            });
            continue;
        }
        if !facts.read_sensors.contains(&binding.sensor) {
            outcome.warnings.push(ValidationWarning {
                code: "W003",
                rule: name.clone(),
                message: format!(
                    "input binding for `{}` is unused: the rule never reads it",
                    binding.sensor
                ),
            });
        }
    }
}
