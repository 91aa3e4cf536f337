//! The embedded configuration source: the effective system configuration
//! baked into the Beacon so it needs no external config file at runtime.

use std::collections::BTreeSet;

use orion_error::prelude::*;
use pulsar_config::SystemConfig;
use pulsar_core::{CompileReason, CompileResult};

use crate::render::SourceBuffer;

use super::{EmitContext, GENERATED_HEADER};

/// The configuration as it will be embedded: `validSensors` auto-populated
/// from the union of referenced input sensors when the document omits it.
pub fn effective_config(ctx: &EmitContext<'_>) -> SystemConfig {
    let mut config = ctx.config.clone();
    if config.valid_sensors.is_none() {
        let sensors: BTreeSet<String> = ctx
            .facts
            .iter()
            .flat_map(|f| f.input_sensors.iter().cloned())
            .collect();
        config.valid_sensors = Some(sensors.into_iter().collect());
    }
    config
}

/// Render `embedded_config.rs`.
pub fn render_embedded_config(ctx: &EmitContext<'_>) -> CompileResult<String> {
    let config = effective_config(ctx);
    let json = match serde_json::to_string_pretty(&config) {
        Ok(json) => json,
        Err(e) => {
            return StructError::from(CompileReason::Emission)
                .with_detail(format!("config serialization: {e}"))
                .err();
        }
    };

    let mut buf = SourceBuffer::new();
    buf.line(GENERATED_HEADER);
    buf.line("//! Effective system configuration, embedded at compile time.");
    buf.blank();
    buf.line(&format!("pub const CYCLE_MS: u64 = {};", config.cycle_time_ms));
    buf.line(&format!(
        "pub const TEST_MODE_CYCLE_MS: u64 = {};",
        config.test_mode_cycle_ms
    ));
    buf.line(&format!(
        "pub const BUFFER_CAPACITY: usize = {};",
        config.buffer_capacity
    ));
    buf.line(&format!("pub const LOG_LEVEL: &str = {:?};", config.log_level));
    buf.blank();

    buf.open("pub const REDIS_ENDPOINTS: &[&str] = &[");
    for endpoint in &config.redis.endpoints {
        buf.line(&format!("{endpoint:?},"));
    }
    buf.close("];");
    buf.blank();

    let valid = config.valid_sensors.as_deref().unwrap_or(&[]);
    if valid.is_empty() {
        buf.line("pub const VALID_SENSORS: &[&str] = &[];");
    } else {
        buf.open("pub const VALID_SENSORS: &[&str] = &[");
        for sensor in valid {
            buf.line(&format!("{sensor:?},"));
        }
        buf.close("];");
    }
    buf.blank();

    buf.line("/// The full configuration document as canonical JSON.");
    buf.line(&format!(
        "pub const EMBEDDED_CONFIG_JSON: &str = r##\"{json}\"##;"
    ));

    Ok(buf.finish())
}
