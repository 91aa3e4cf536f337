//! Packaging extras for the `beacon` verb: a crate manifest and a main
//! source wiring the coordinator to a fixed-period loop.

use crate::render::SourceBuffer;

use super::{EmitContext, GENERATED_HEADER};

/// Render the Beacon crate's `Cargo.toml`.
pub fn render_beacon_cargo_toml(artifact_name: &str) -> String {
    let mut buf = SourceBuffer::new();
    buf.line("# Generated by the Pulsar rules compiler. Do not edit.");
    buf.line("[package]");
    buf.line(&format!("name = {artifact_name:?}"));
    buf.line("version = \"0.1.0\"");
    buf.line("edition = \"2024\"");
    buf.blank();
    buf.line("[dependencies]");
    buf.line("pulsar-runtime = \"0.1\"");
    buf.line("tracing = \"0.1\"");
    buf.line("tracing-subscriber = { version = \"0.3\", features = [\"env-filter\", \"fmt\"] }");
    buf.finish()
}

/// Render the Beacon `main.rs`: module declarations for every emitted
/// source plus the cycle loop. Input/output adapters to the key-value
/// backend attach at the marked seam.
pub fn render_beacon_main(ctx: &EmitContext<'_>) -> String {
    let mut buf = SourceBuffer::new();
    buf.line(GENERATED_HEADER);
    buf.blank();
    buf.line("mod beacon_metadata;");
    buf.line("mod coordinator;");
    buf.line("mod embedded_config;");
    for group in ctx.groups {
        buf.line(&format!("mod {};", EmitContext::group_module(group.index)));
    }
    buf.blank();
    buf.line("use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};");
    buf.blank();
    buf.line("use pulsar_runtime::prelude::CycleState;");
    buf.line("use pulsar_runtime::SensorSnapshot;");
    buf.blank();
    buf.open("fn main() {");
    buf.line("tracing_subscriber::fmt()");
    buf.line("    .with_env_filter(embedded_config::LOG_LEVEL)");
    buf.line("    .init();");
    buf.blank();
    buf.line("let cycle = Duration::from_millis(embedded_config::CYCLE_MS);");
    buf.line("let mut state = CycleState::new(embedded_config::BUFFER_CAPACITY);");
    buf.line(&format!(
        "tracing::info!(rules = beacon_metadata::RULES.len(), groups = {}, \"beacon started\");",
        ctx.groups.len()
    ));
    buf.blank();
    buf.open("loop {");
    buf.line("let started = Instant::now();");
    buf.line("let now_ms = SystemTime::now()");
    buf.line("    .duration_since(UNIX_EPOCH)");
    buf.line("    .map(|d| d.as_millis() as i64)");
    buf.line("    .unwrap_or(0);");
    buf.blank();
    buf.line("// Store adapters attach here: capture the cycle snapshot from");
    buf.line("// the key-value backend, then publish the drained emissions.");
    buf.line("state.begin_cycle(SensorSnapshot::new(), now_ms);");
    buf.line("coordinator::run_cycle(&mut state);");
    buf.line("let _emissions = state.take_emissions();");
    buf.blank();
    buf.open("if let Some(remaining) = cycle.checked_sub(started.elapsed()) {");
    buf.line("std::thread::sleep(remaining);");
    buf.close("}");
    buf.close("}");
    buf.close("}");
    buf.finish()
}
