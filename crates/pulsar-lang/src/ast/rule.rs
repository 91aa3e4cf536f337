use super::*;

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Where a rule came from: source file label and the 1-based line of its
/// `name:` scalar (document start when the scan cannot find it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub file: String,
    pub line: usize,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A named rule: one condition tree, a non-empty action list, an optional
/// else branch, and optional per-sensor input bindings.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Rule {
    pub name: String,
    pub description: Option<String>,
    pub condition: ConditionTree,
    pub actions: Vec<Action>,
    pub else_actions: Vec<Action>,
    pub inputs: Vec<InputBinding>,
    pub provenance: Provenance,
}

/// Declared handling for one of a rule's input sensors.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct InputBinding {
    pub sensor: String,
    pub required: bool,
    pub fallback: FallbackPolicy,
}

impl InputBinding {
    pub fn new(sensor: String, required: bool, fallback: FallbackPolicy) -> Self {
        InputBinding {
            sensor,
            required,
            fallback,
        }
    }
}

/// What an unavailable sensor read resolves to.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FallbackPolicy {
    UseDefault(Literal),
    UseLastKnown { max_age_ms: Option<u64> },
    PropagateUnavailable,
    SkipRule,
}

// ---------------------------------------------------------------------------
// Sensor identifiers
// ---------------------------------------------------------------------------

/// Namespace of a sensor identifier, derived from its optional prefix.
/// Unprefixed identifiers are inputs by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorClass {
    Input,
    Output,
    Buffer,
}

/// Split a sensor identifier into its class and bare name.
pub fn classify_sensor(id: &str) -> (SensorClass, &str) {
    match id.split_once(':') {
        Some(("input", rest)) => (SensorClass::Input, rest),
        Some(("output", rest)) => (SensorClass::Output, rest),
        Some(("buffer", rest)) => (SensorClass::Buffer, rest),
        _ => (SensorClass::Input, id),
    }
}
