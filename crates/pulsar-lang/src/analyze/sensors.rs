//! Sensor extraction visitors over condition and action trees.

use crate::ast::*;

use super::RuleFacts;

pub(super) fn collect_condition_sensors(tree: &ConditionTree, facts: &mut RuleFacts) {
    match tree {
        ConditionTree::Group { all, any } => {
            for child in all.iter().chain(any.iter()) {
                collect_condition_sensors(child, facts);
            }
        }
        ConditionTree::Comparison { sensor, .. } => record_condition_sensor(sensor, facts),
        ConditionTree::TemporalThreshold { sensor, .. } => {
            record_condition_sensor(sensor, facts);
            facts.temporal_sensors.insert(sensor.clone());
        }
        ConditionTree::Expression { expr, .. } => {
            let mut sensors = Vec::new();
            expr.sensors(&mut sensors);
            for sensor in sensors {
                record_condition_sensor(sensor, facts);
            }
        }
    }
}

/// Action-side expressions contribute their `input:`-prefixed identifiers
/// to the rule's input set; every identifier counts as a read for
/// dependency purposes.
pub(super) fn collect_action_sensors(action: &Action, facts: &mut RuleFacts) {
    let Some(sourced) = action.expression() else {
        return;
    };
    let mut sensors = Vec::new();
    sourced.expr.sensors(&mut sensors);
    for sensor in sensors {
        facts.read_sensors.insert(sensor.to_string());
        if sensor.starts_with("input:") {
            facts.input_sensors.insert(sensor.to_string());
        }
    }
}

fn record_condition_sensor(sensor: &str, facts: &mut RuleFacts) {
    facts.read_sensors.insert(sensor.to_string());
    if classify_sensor(sensor).0 == SensorClass::Input {
        facts.input_sensors.insert(sensor.to_string());
    }
}
