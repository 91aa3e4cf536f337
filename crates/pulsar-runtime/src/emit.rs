//! Per-key emit-mode state: the OnChange previous-value cache and the
//! OnEnter latch. Process-wide, initialized once at runtime start.

use std::collections::BTreeMap;

use pulsar_core::{Value, values_equal};

#[derive(Debug, Clone, Default)]
pub struct EmitGates {
    previous: BTreeMap<String, Option<Value>>,
    entered: BTreeMap<String, bool>,
}

impl EmitGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// OnChange: emit iff the value differs from the last emitted value
    /// for this key (or nothing was emitted yet). Updates the cache.
    pub fn on_change(&mut self, key: &str, value: &Option<Value>) -> bool {
        let changed = match self.previous.get(key) {
            Some(prev) => !option_values_equal(prev, value),
            None => true,
        };
        if changed {
            self.previous.insert(key.to_string(), value.clone());
        }
        changed
    }

    /// OnEnter: emit iff the rule condition is True now and was not True
    /// when this key was last considered. Must be fed every cycle, firing
    /// or not, so the latch tracks edges correctly.
    pub fn on_enter(&mut self, key: &str, condition_active: bool) -> bool {
        let was_active = self
            .entered
            .insert(key.to_string(), condition_active)
            .unwrap_or(false);
        condition_active && !was_active
    }
}

fn option_values_equal(a: &Option<Value>, b: &Option<Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => values_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_change_emits_first_value_then_only_changes() {
        let mut gates = EmitGates::new();
        let one = Some(Value::Number(1.0));
        let two = Some(Value::Number(2.0));
        assert!(gates.on_change("output:x", &one));
        assert!(!gates.on_change("output:x", &one));
        assert!(gates.on_change("output:x", &two));
        assert!(!gates.on_change("output:x", &two));
    }

    #[test]
    fn on_change_treats_null_as_a_value() {
        let mut gates = EmitGates::new();
        assert!(gates.on_change("output:x", &None));
        assert!(!gates.on_change("output:x", &None));
        assert!(gates.on_change("output:x", &Some(Value::Bool(true))));
    }

    #[test]
    fn on_enter_fires_only_on_the_rising_edge() {
        let mut gates = EmitGates::new();
        assert!(gates.on_enter("output:x", true));
        assert!(!gates.on_enter("output:x", true));
        assert!(!gates.on_enter("output:x", false));
        assert!(gates.on_enter("output:x", true));
    }

    #[test]
    fn keys_are_independent() {
        let mut gates = EmitGates::new();
        assert!(gates.on_enter("a", true));
        assert!(gates.on_enter("b", true));
    }
}
