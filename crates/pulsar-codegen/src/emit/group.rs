//! One evaluation unit per rule group.

use pulsar_core::RuleGroup;

use crate::render::{SourceBuffer, render_action, render_binding, render_condition};

use super::{EmitContext, GENERATED_HEADER};

/// Render the `g_<i>.rs` source for one group. Rules are constructed once
/// behind a `OnceLock` and evaluated in emission order by `evaluate`.
pub fn render_group_unit(ctx: &EmitContext<'_>, group: &RuleGroup) -> String {
    let mut buf = SourceBuffer::new();
    buf.line(GENERATED_HEADER);
    buf.line(&format!(
        "//! Evaluation unit `{}`: {} rule(s) at layer {}.",
        EmitContext::group_module(group.index),
        group.rules.len(),
        group.layer
    ));
    buf.blank();
    buf.line("use std::sync::OnceLock;");
    buf.blank();
    buf.line("use pulsar_runtime::prelude::*;");
    buf.blank();
    buf.line(&format!("pub const GROUP_INDEX: usize = {};", group.index));
    buf.line(&format!("pub const LAYER: usize = {};", group.layer));
    buf.blank();

    buf.line("/// Sensors this group reads.");
    let sensors = ctx.group_required_sensors(group);
    if sensors.is_empty() {
        buf.line("pub const REQUIRED_SENSORS: &[&str] = &[];");
    } else {
        buf.open("pub const REQUIRED_SENSORS: &[&str] = &[");
        for sensor in &sensors {
            buf.line(&format!("{sensor:?},"));
        }
        buf.close("];");
    }
    buf.blank();

    buf.open("fn rules() -> &'static [CompiledRule] {");
    buf.line("static RULES: OnceLock<Vec<CompiledRule>> = OnceLock::new();");
    buf.open("RULES.get_or_init(|| vec![");
    for &rule_index in &group.rules {
        render_compiled_rule(ctx, rule_index, &mut buf);
    }
    buf.close("])");
    buf.close("}");
    buf.blank();

    buf.line("/// Evaluate every rule in this group, in emission order.");
    buf.open("pub fn evaluate(state: &mut CycleState) {");
    buf.open("for rule in rules() {");
    buf.line("evaluate_rule(rule, state);");
    buf.close("}");
    buf.close("}");

    buf.finish()
}

fn render_compiled_rule(ctx: &EmitContext<'_>, rule_index: usize, buf: &mut SourceBuffer) {
    let rule = &ctx.rules[rule_index];
    let facts = &ctx.facts[rule_index];

    buf.open("CompiledRule {");
    buf.line(&format!("name: {:?}.to_string(),", rule.name));

    // Condition block, comma-terminated as a struct field.
    let mut condition = SourceBuffer::new();
    render_condition(&mut condition, &rule.condition);
    let rendered = condition.finish();
    let mut lines = rendered.lines().peekable();
    if let Some(first) = lines.next() {
        buf.line(&format!("condition: {first}"));
    }
    while let Some(line) = lines.next() {
        if lines.peek().is_none() {
            buf.line(&format!("{line},"));
        } else {
            buf.line(line);
        }
    }

    render_action_list(buf, "actions", ctx, rule_index, false);
    render_action_list(buf, "else_actions", ctx, rule_index, true);

    if rule.inputs.is_empty() {
        buf.line("bindings: vec![],");
    } else {
        buf.open("bindings: vec![");
        for binding in &rule.inputs {
            render_binding(buf, binding);
        }
        buf.close("],");
    }

    match &facts.canonical_input {
        Some(sensor) => buf.line(&format!(
            "canonical_input: Some({sensor:?}.to_string()),"
        )),
        None => buf.line("canonical_input: None,"),
    }
    buf.close("},");
}

fn render_action_list(
    buf: &mut SourceBuffer,
    field: &str,
    ctx: &EmitContext<'_>,
    rule_index: usize,
    else_branch: bool,
) {
    let rule = &ctx.rules[rule_index];
    let actions = if else_branch {
        &rule.else_actions
    } else {
        &rule.actions
    };
    if actions.is_empty() {
        buf.line(&format!("{field}: vec![],"));
        return;
    }
    buf.open(&format!("{field}: vec!["));
    for action in actions {
        render_action(buf, action);
    }
    buf.close("],");
}
