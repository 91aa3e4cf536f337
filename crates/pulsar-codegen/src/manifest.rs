//! The machine-readable build manifest.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use orion_error::prelude::*;
use pulsar_core::{CompileReason, CompileResult};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::emit::EmitContext;
use crate::pipeline::RenderedFile;

pub const MANIFEST_SCHEMA_VERSION: &str = "1.0";
pub const MANIFEST_FILENAME: &str = "rules.manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub schema_version: String,
    pub generated_at: String,
    pub files: Vec<FileEntry>,
    pub rules: BTreeMap<String, RuleEntry>,
    pub build_metrics: BuildMetrics,
    pub dependency_analysis: DependencyAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub path: String,
    /// SHA-256 of the file contents, base64.
    pub hash: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_range: Option<[usize; 2]>,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleEntry {
    pub source_file: String,
    pub source_line: usize,
    pub dependencies: Vec<String>,
    pub layer: usize,
    pub input_sensors: Vec<String>,
    pub output_sensors: Vec<String>,
    pub temporal: bool,
    pub complexity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildMetrics {
    pub total_rules: usize,
    pub rule_complexity: BTreeMap<String, u32>,
    pub temporal_rule_count: usize,
    pub average_complexity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyAnalysis {
    /// Rule → rules it depends on.
    pub rule_dependencies: BTreeMap<String, Vec<String>>,
    /// Sensor → rules that read it.
    pub sensor_dependencies: BTreeMap<String, Vec<String>>,
    /// Rule → dependencies read through temporal conditions.
    pub temporal_dependencies: BTreeMap<String, Vec<String>>,
    pub max_depth: usize,
}

pub fn content_hash(bytes: &[u8]) -> String {
    BASE64.encode(Sha256::digest(bytes))
}

/// Build the manifest over the rendered (but not yet written) files.
pub fn build_manifest(
    ctx: &EmitContext<'_>,
    files: &[RenderedFile],
    generated_at: DateTime<Utc>,
) -> Manifest {
    let file_entries = files
        .iter()
        .map(|file| {
            let contained: Vec<String> = file
                .rules
                .iter()
                .map(|&i| ctx.rules[i].name.clone())
                .collect();
            let layer_range = file.rules.iter().map(|&i| ctx.layers[i]).fold(
                None,
                |acc: Option<[usize; 2]>, layer| match acc {
                    Some([lo, hi]) => Some([lo.min(layer), hi.max(layer)]),
                    None => Some([layer, layer]),
                },
            );
            FileEntry {
                filename: file
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: file.path.to_string_lossy().into_owned(),
                hash: content_hash(file.contents.as_bytes()),
                label: file.label.clone(),
                layer_range,
                rules: contained,
            }
        })
        .collect();

    let mut rules = BTreeMap::new();
    let mut rule_complexity = BTreeMap::new();
    let mut rule_dependencies = BTreeMap::new();
    let mut temporal_dependencies = BTreeMap::new();
    for (index, rule) in ctx.rules.iter().enumerate() {
        let facts = &ctx.facts[index];
        rules.insert(
            rule.name.clone(),
            RuleEntry {
                source_file: rule.provenance.file.clone(),
                source_line: rule.provenance.line,
                dependencies: ctx.graph.dependency_names(index),
                layer: ctx.layers[index],
                input_sensors: facts.input_sensors.iter().cloned().collect(),
                output_sensors: facts.output_sensors.iter().cloned().collect(),
                temporal: facts.temporal,
                complexity: facts.complexity,
            },
        );
        rule_complexity.insert(rule.name.clone(), facts.complexity);
        rule_dependencies.insert(rule.name.clone(), ctx.graph.dependency_names(index));
        let temporal = ctx.graph.temporal_dependency_names(index);
        if !temporal.is_empty() {
            temporal_dependencies.insert(rule.name.clone(), temporal);
        }
    }

    let total_rules = ctx.rules.len();
    let temporal_rule_count = ctx.facts.iter().filter(|f| f.temporal).count();
    let average_complexity = if total_rules == 0 {
        0.0
    } else {
        ctx.facts.iter().map(|f| f.complexity as f64).sum::<f64>() / total_rules as f64
    };

    Manifest {
        schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        files: file_entries,
        rules,
        build_metrics: BuildMetrics {
            total_rules,
            rule_complexity,
            temporal_rule_count,
            average_complexity,
        },
        dependency_analysis: DependencyAnalysis {
            rule_dependencies,
            sensor_dependencies: ctx.graph.reader_names(),
            temporal_dependencies,
            max_depth: ctx.graph.max_depth(),
        },
    }
}

impl Manifest {
    pub fn to_json(&self) -> CompileResult<String> {
        match serde_json::to_string_pretty(self) {
            Ok(mut json) => {
                json.push('\n');
                Ok(json)
            }
            Err(e) => StructError::from(CompileReason::Emission)
                .with_detail(format!("manifest serialization: {e}"))
                .err(),
        }
    }
}
