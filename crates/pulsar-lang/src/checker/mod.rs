mod collection;
mod lint;
mod rules;

#[cfg(test)]
mod tests;

pub use lint::{Lint, LintSeverity, lint_rules};

use std::collections::BTreeSet;

use crate::ast::Rule;

/// How strictly unknown sensors are treated when a catalog is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    Strict,
    #[default]
    Normal,
    Relaxed,
}

impl std::str::FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(ValidationLevel::Strict),
            "normal" => Ok(ValidationLevel::Normal),
            "relaxed" => Ok(ValidationLevel::Relaxed),
            other => Err(format!("unknown validation level `{other}`")),
        }
    }
}

/// A structural validation error, with the rule it belongs to when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub rule: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "[{}] rule `{}`: {}", self.code, rule, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// An advisory finding. Promoted to an error only at pipeline end, under
/// `--fail-on-warnings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: &'static str,
    pub rule: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "[{}] rule `{}`: {}", self.code, rule, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a collection of rules: per-rule structural invariants, the
/// cross-rule single-writer invariant, and — when `known_sensors` is given —
/// unknown-sensor checks at the requested level. Errors are accumulated, not
/// short-circuited, so one pass reports every broken rule.
pub fn check_rules(
    rules: &[Rule],
    known_sensors: Option<&BTreeSet<String>>,
    level: ValidationLevel,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for rule in rules {
        rules::check_rule(rule, &mut outcome);
    }
    collection::check_single_writer(rules, &mut outcome);
    if let Some(catalog) = known_sensors {
        collection::check_known_sensors(rules, catalog, level, &mut outcome);
    }

    outcome
}
