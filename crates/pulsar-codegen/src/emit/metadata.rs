//! The companion metadata source: per-rule provenance and analysis facts.

use crate::render::SourceBuffer;

use super::{EmitContext, GENERATED_HEADER};

/// Render `beacon_metadata.rs`.
pub fn render_metadata(ctx: &EmitContext<'_>) -> String {
    let mut buf = SourceBuffer::new();
    buf.line(GENERATED_HEADER);
    buf.line("//! Rule metadata: provenance, layering, and analysis facts.");
    buf.blank();
    buf.open("pub struct RuleMeta {");
    buf.line("pub name: &'static str,");
    buf.line("pub source_file: &'static str,");
    buf.line("pub source_line: u32,");
    buf.line("pub layer: usize,");
    buf.line("pub dependencies: &'static [&'static str],");
    buf.line("pub input_sensors: &'static [&'static str],");
    buf.line("pub output_sensors: &'static [&'static str],");
    buf.line("pub temporal: bool,");
    buf.line("pub complexity: u32,");
    buf.close("}");
    buf.blank();

    buf.open("pub const RULES: &[RuleMeta] = &[");
    for (index, rule) in ctx.rules.iter().enumerate() {
        let facts = &ctx.facts[index];
        buf.open("RuleMeta {");
        buf.line(&format!("name: {:?},", rule.name));
        buf.line(&format!("source_file: {:?},", rule.provenance.file));
        buf.line(&format!("source_line: {},", rule.provenance.line));
        buf.line(&format!("layer: {},", ctx.layers[index]));
        buf.line(&format!(
            "dependencies: &[{}],",
            str_slice(&ctx.graph.dependency_names(index))
        ));
        buf.line(&format!(
            "input_sensors: &[{}],",
            str_slice(&facts.input_sensors.iter().cloned().collect::<Vec<_>>())
        ));
        buf.line(&format!(
            "output_sensors: &[{}],",
            str_slice(&facts.output_sensors.iter().cloned().collect::<Vec<_>>())
        ));
        buf.line(&format!("temporal: {},", facts.temporal));
        buf.line(&format!("complexity: {},", facts.complexity));
        buf.close("},");
    }
    buf.close("];");

    buf.finish()
}

fn str_slice(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("{s:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}
