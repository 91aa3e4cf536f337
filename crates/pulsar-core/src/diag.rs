//! Accumulated diagnostics with structured context.
//!
//! Errors within one pipeline stage are collected, not short-circuited;
//! stages themselves short-circuit. Every diagnostic carries a context map
//! so the renderer can show `file:line` and the rule name when known.

use std::collections::BTreeMap;

use pulsar_lang::{ParseError, ValidationError, ValidationWarning};

/// Which stage of the pipeline produced a diagnostic. Doubles as the
/// user-visible taxonomy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Validation,
    Dependency,
    Catalog,
    Emission,
    Configuration,
}

impl Stage {
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::Parse => "ParseError",
            Stage::Validation => "ValidationError",
            Stage::Dependency => "DependencyError",
            Stage::Catalog => "CatalogError",
            Stage::Emission => "EmissionError",
            Stage::Configuration => "ConfigurationError",
        }
    }
}

/// One error or warning, with its structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    pub context: BTreeMap<&'static str, String>,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.insert(key, value.into());
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.context.get("file").map(String::as_str)
    }

    pub fn line(&self) -> Option<usize> {
        self.context.get("line").and_then(|l| l.parse().ok())
    }

    pub fn rule(&self) -> Option<&str> {
        self.context.get("rule").map(String::as_str)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.stage.tag())?;
        if let Some(file) = self.file() {
            match self.line() {
                Some(line) => write!(f, "{file}:{line}: ")?,
                None => write!(f, "{file}: ")?,
            }
        }
        if let Some(rule) = self.rule() {
            write!(f, "rule `{rule}`: ")?;
        }
        write!(f, "{}", self.message)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Self {
        Diagnostic::new(Stage::Parse, e.reason)
            .with("file", e.file)
            .with("line", e.line.to_string())
    }
}

impl From<ValidationError> for Diagnostic {
    fn from(e: ValidationError) -> Self {
        let stage = if e.code == "V021" {
            Stage::Catalog
        } else {
            Stage::Validation
        };
        let diag = Diagnostic::new(stage, e.message).with("code", e.code);
        match e.rule {
            Some(rule) => diag.with("rule", rule),
            None => diag,
        }
    }
}

impl From<ValidationWarning> for Diagnostic {
    fn from(w: ValidationWarning) -> Self {
        let diag = Diagnostic::new(Stage::Validation, w.message).with("code", w.code);
        match w.rule {
            Some(rule) => diag.with("rule", rule),
            None => diag,
        }
    }
}

/// A dependency cycle rendered as a ring: `a → b → … → a`.
pub fn cycle_diagnostic(cycle: &[String]) -> Diagnostic {
    let mut ring = cycle.join(" -> ");
    if let Some(first) = cycle.first() {
        ring.push_str(" -> ");
        ring.push_str(first);
    }
    Diagnostic::new(Stage::Dependency, format!("dependency cycle: {ring}")).with("cycle", ring)
}
