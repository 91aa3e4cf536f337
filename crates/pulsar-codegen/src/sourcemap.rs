//! Sourcemap sidecar: maps every rule back from its emitted unit to its
//! rule-document provenance.

use orion_error::prelude::*;
use pulsar_core::{CompileReason, CompileResult};
use serde::Serialize;

use crate::emit::EmitContext;

pub const SOURCEMAP_FILENAME: &str = "rules.sourcemap.json";

#[derive(Debug, Clone, Serialize)]
pub struct SourceMap {
    pub schema_version: String,
    pub entries: Vec<SourceMapEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceMapEntry {
    pub rule: String,
    pub emitted_file: String,
    pub group: usize,
    pub layer: usize,
    pub source_file: String,
    pub source_line: usize,
}

pub fn build_sourcemap(ctx: &EmitContext<'_>) -> SourceMap {
    let mut entries = Vec::new();
    for group in ctx.groups {
        let emitted_file = format!("{}.rs", EmitContext::group_module(group.index));
        for &rule_index in &group.rules {
            let rule = &ctx.rules[rule_index];
            entries.push(SourceMapEntry {
                rule: rule.name.clone(),
                emitted_file: emitted_file.clone(),
                group: group.index,
                layer: group.layer,
                source_file: rule.provenance.file.clone(),
                source_line: rule.provenance.line,
            });
        }
    }
    SourceMap {
        schema_version: "1.0".to_string(),
        entries,
    }
}

impl SourceMap {
    pub fn to_json(&self) -> CompileResult<String> {
        match serde_json::to_string_pretty(self) {
            Ok(mut json) => {
                json.push('\n');
                Ok(json)
            }
            Err(e) => StructError::from(CompileReason::Emission)
                .with_detail(format!("sourcemap serialization: {e}"))
                .err(),
        }
    }
}
