//! Advisory lints. These never fail a build on their own; the driver may
//! promote them with `--lint-level error`.

use std::collections::BTreeMap;

use crate::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LintSeverity {
    Info,
    #[default]
    Warn,
    Error,
}

impl std::str::FromStr for LintSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(LintSeverity::Info),
            "warn" => Ok(LintSeverity::Warn),
            "error" => Ok(LintSeverity::Error),
            other => Err(format!("unknown lint level `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lint {
    pub code: &'static str,
    pub severity: LintSeverity,
    pub rule: String,
    pub message: String,
}

impl std::fmt::Display for Lint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] rule `{}`: {}", self.code, self.rule, self.message)
    }
}

/// Run every lint over the rule set. `cycle_ms` enables the
/// shorter-than-one-cycle window lint when the system config is at hand.
pub fn lint_rules(rules: &[Rule], cycle_ms: Option<u64>) -> Vec<Lint> {
    let mut lints = Vec::new();

    for rule in rules {
        constant_condition(rule, &mut lints);
        on_enter_in_else(rule, &mut lints);
        if let Some(cycle) = cycle_ms {
            short_window(rule, cycle, &mut lints);
        }
    }
    duplicate_condition_trees(rules, &mut lints);

    lints
}

/// A condition that reads no sensors evaluates the same way every cycle.
fn constant_condition(rule: &Rule, lints: &mut Vec<Lint>) {
    let facts = crate::analyze::analyze_rule(rule);
    if facts.read_sensors.is_empty() {
        lints.push(Lint {
            code: "L001",
            severity: LintSeverity::Warn,
            rule: rule.name.clone(),
            message: "condition references no sensors and is constant".to_string(),
        });
    }
}

/// `on_enter` gating inside an else branch never fires: the else branch
/// runs only while the condition is False, so the enter edge cannot occur
/// there.
fn on_enter_in_else(rule: &Rule, lints: &mut Vec<Lint>) {
    for action in &rule.else_actions {
        if action.emit_mode() == EmitMode::OnEnter {
            lints.push(Lint {
                code: "L002",
                severity: LintSeverity::Warn,
                rule: rule.name.clone(),
                message: "else action uses `emit: on_enter`, which never fires".to_string(),
            });
        }
    }
}

/// A temporal window shorter than one evaluation cycle holds at most one
/// sample, making the threshold equivalent to a plain comparison.
fn short_window(rule: &Rule, cycle_ms: u64, lints: &mut Vec<Lint>) {
    fn walk(tree: &ConditionTree, rule: &str, cycle_ms: u64, lints: &mut Vec<Lint>) {
        match tree {
            ConditionTree::Group { all, any } => {
                for child in all.iter().chain(any.iter()) {
                    walk(child, rule, cycle_ms, lints);
                }
            }
            ConditionTree::TemporalThreshold {
                sensor,
                duration_ms,
                ..
            } if *duration_ms < cycle_ms => lints.push(Lint {
                code: "L003",
                severity: LintSeverity::Info,
                rule: rule.to_string(),
                message: format!(
                    "window of {duration_ms} ms on `{sensor}` is shorter than the {cycle_ms} ms cycle"
                ),
            }),
            _ => {}
        }
    }
    walk(&rule.condition, &rule.name, cycle_ms, lints);
}

/// Two rules with byte-identical condition trees usually mean a copy-paste
/// slip; one of them should probably read the other's output.
fn duplicate_condition_trees(rules: &[Rule], lints: &mut Vec<Lint>) {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for rule in rules {
        let fingerprint = format!("{:?}", rule.condition);
        match seen.get(fingerprint.as_str()) {
            Some(first) => lints.push(Lint {
                code: "L004",
                severity: LintSeverity::Info,
                rule: rule.name.clone(),
                message: format!("condition tree is identical to rule `{first}`"),
            }),
            None => {
                seen.insert(fingerprint, &rule.name);
            }
        }
    }
}
