//! Cross-rule checks: the single-writer invariant and catalog membership.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::analyze::analyze_rule;
use crate::ast::Rule;

use super::{ValidationError, ValidationLevel, ValidationOutcome, ValidationWarning};

/// No two rules may write the same `set_value` key. Combined with
/// acyclicity this guarantees a single producer per sensor.
pub(super) fn check_single_writer(rules: &[Rule], outcome: &mut ValidationOutcome) {
    let mut writers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for rule in rules {
        for action in rule.actions.iter().chain(rule.else_actions.iter()) {
            if let Some(key) = action.set_key() {
                writers.entry(key).or_default().push(&rule.name);
            }
        }
    }
    for (key, mut names) in writers {
        names.dedup();
        if names.len() > 1 {
            outcome.errors.push(ValidationError {
                code: "V020",
                rule: None,
                message: format!(
                    "sensor `{key}` is written by more than one rule: {}",
                    names.join(", ")
                ),
            });
        }
    }
}

/// With a sensor catalog in play, a referenced input sensor that is neither
/// catalogued nor written by any rule is an error under `strict`, a warning
/// under `normal`, and ignored under `relaxed`.
pub(super) fn check_known_sensors(
    rules: &[Rule],
    catalog: &BTreeSet<String>,
    level: ValidationLevel,
    outcome: &mut ValidationOutcome,
) {
    if level == ValidationLevel::Relaxed {
        return;
    }

    let written: BTreeSet<String> = rules
        .iter()
        .flat_map(|rule| {
            rule.actions
                .iter()
                .chain(rule.else_actions.iter())
                .filter_map(|action| action.set_key().map(str::to_string))
        })
        .collect();

    for rule in rules {
        let facts = analyze_rule(rule);
        for sensor in &facts.read_sensors {
            if catalog.contains(sensor) || written.contains(sensor) {
                continue;
            }
            match level {
                ValidationLevel::Strict => outcome.errors.push(ValidationError {
                    code: "V021",
                    rule: Some(rule.name.clone()),
                    message: format!("sensor `{sensor}` is not in the sensor catalog"),
                }),
                ValidationLevel::Normal => outcome.warnings.push(ValidationWarning {
                    code: "W004",
                    rule: Some(rule.name.clone()),
                    message: format!("sensor `{sensor}` is not in the sensor catalog"),
                }),
                ValidationLevel::Relaxed => {}
            }
        }
    }
}
