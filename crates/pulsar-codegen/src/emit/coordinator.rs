//! The cycle coordinator: drives groups in ascending layer order.

use crate::render::SourceBuffer;

use super::{EmitContext, GENERATED_HEADER};

/// Render `coordinator.rs`. Groups are already ordered by layer, so the
/// coordinator is a straight-line sequence of `evaluate` calls: outputs of
/// group g are visible to group g+1 within the same cycle, and to every
/// group in the next cycle.
pub fn render_coordinator(ctx: &EmitContext<'_>) -> String {
    let mut buf = SourceBuffer::new();
    buf.line(GENERATED_HEADER);
    buf.line("//! Cycle coordinator: invokes every evaluation unit once per");
    buf.line("//! cycle, in ascending layer order.");
    buf.blank();
    buf.line("use pulsar_runtime::prelude::CycleState;");
    buf.blank();

    if !ctx.groups.is_empty() {
        let modules: Vec<String> = ctx
            .groups
            .iter()
            .map(|g| EmitContext::group_module(g.index))
            .collect();
        buf.line(&format!("use crate::{{{}}};", modules.join(", ")));
        buf.blank();
    }

    buf.line(&format!(
        "pub const GROUP_COUNT: usize = {};",
        ctx.groups.len()
    ));
    let max_layer = ctx.groups.iter().map(|g| g.layer).max().unwrap_or(0);
    buf.line(&format!("pub const LAYER_COUNT: usize = {};", max_layer + 1));
    buf.blank();

    buf.line("/// Run one evaluation cycle over the snapshot installed in `state`.");
    buf.open("pub fn run_cycle(state: &mut CycleState) {");
    if ctx.groups.is_empty() {
        buf.line("let _ = state;");
    }
    for group in ctx.groups {
        buf.line(&format!(
            "{}::evaluate(state); // layer {}",
            EmitContext::group_module(group.index),
            group.layer
        ));
    }
    buf.close("}");

    buf.finish()
}
