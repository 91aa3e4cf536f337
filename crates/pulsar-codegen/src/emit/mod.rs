//! Emission of Beacon sources: one unit per group, a coordinator, a
//! metadata source, and the embedded configuration.
//!
//! Everything here is deterministic text generation: rule iteration
//! follows emission order, keyed collections are BTree-sorted, and no
//! timestamps appear inside the sources.

mod config;
mod coordinator;
mod group;
mod metadata;
mod package;

pub use config::render_embedded_config;
pub use coordinator::render_coordinator;
pub use group::render_group_unit;
pub use metadata::render_metadata;
pub use package::{render_beacon_cargo_toml, render_beacon_main};

use pulsar_config::SystemConfig;
use pulsar_core::{DependencyGraph, RuleGroup};
use pulsar_lang::RuleFacts;
use pulsar_lang::ast::Rule;

pub(crate) const GENERATED_HEADER: &str = "// Generated by the Pulsar rules compiler. Do not edit.";

/// Everything the emitters read. Arena order is parse order; groups refer
/// to rules by arena index.
pub struct EmitContext<'a> {
    pub rules: &'a [Rule],
    pub facts: &'a [RuleFacts],
    pub graph: &'a DependencyGraph,
    pub layers: &'a [usize],
    pub groups: &'a [RuleGroup],
    pub config: &'a SystemConfig,
}

impl EmitContext<'_> {
    /// The module name of a group unit: `g_0`, `g_1`, …
    pub fn group_module(index: usize) -> String {
        format!("g_{index}")
    }

    /// Union of condition input sensors across a group's rules, sorted.
    pub fn group_required_sensors(&self, group: &RuleGroup) -> Vec<String> {
        let mut sensors: Vec<String> = group
            .rules
            .iter()
            .flat_map(|&i| self.facts[i].input_sensors.iter().cloned())
            .collect();
        sensors.sort();
        sensors.dedup();
        sensors
    }
}
