//! Pipeline driver: parse → validate → analyze → graph → layer → group →
//! render → write → manifest.
//!
//! Single-threaded and synchronous. Stages accumulate their own errors and
//! short-circuit across stages; artifacts are rendered entirely in memory
//! and written in one final sweep, so any failure before the sweep leaves
//! the output directory untouched.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use pulsar_config::SystemConfig;
use pulsar_core::{
    DEFAULT_MAX_DEPENDENCY_DEPTH, Diagnostic, GroupLimits, Stage, build_graph, cycle_diagnostic,
    partition_groups,
};
use pulsar_lang::{LintSeverity, RuleFacts, ValidationLevel, analyze_rule, check_rules, lint_rules};

use crate::catalog::SensorCatalog;
use crate::emit::{
    EmitContext, render_beacon_cargo_toml, render_beacon_main, render_coordinator,
    render_embedded_config, render_group_unit, render_metadata,
};
use crate::manifest::{MANIFEST_FILENAME, build_manifest};
use crate::sourcemap::{SOURCEMAP_FILENAME, build_sourcemap};

/// Which part of the pipeline a verb runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Parse + validate only (`validate`).
    Validate,
    /// Validate + analysis sanity checks, no emission (`test`).
    Check,
    /// Emit sources without packaging (`generate`).
    Sources,
    /// Emit sources + manifest (`compile`).
    Compile,
    /// Full deployable artifact directory (`beacon`).
    Beacon,
}

impl PipelineMode {
    fn emits(&self) -> bool {
        matches!(
            self,
            PipelineMode::Sources | PipelineMode::Compile | PipelineMode::Beacon
        )
    }
}

/// Runtime targets this compiler can emit for.
pub const KNOWN_TARGETS: &[&str] = &["beacon"];

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub rules_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub target: Option<String>,
    pub validation_level: ValidationLevel,
    pub lint: bool,
    pub lint_level: LintSeverity,
    pub fail_on_warnings: bool,
    /// In `generate` mode, also write the manifest.
    pub generate_metadata: bool,
    pub emit_sourcemap: bool,
    /// Empty the output directory before the sweep.
    pub clean: bool,
    pub group_limits: GroupLimits,
    pub max_dependency_depth: usize,
    /// Package name for the `beacon` verb's generated crate.
    pub artifact_name: String,
    /// Manifest timestamp override; `None` means now. Pinned by tests.
    pub generated_at: Option<DateTime<Utc>>,
}

impl CompileOptions {
    pub fn new(rules_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_path: rules_path.into(),
            config_path: None,
            catalog_path: None,
            output_dir: output_dir.into(),
            target: None,
            validation_level: ValidationLevel::Normal,
            lint: false,
            lint_level: LintSeverity::Warn,
            fail_on_warnings: false,
            generate_metadata: false,
            emit_sourcemap: false,
            clean: false,
            group_limits: GroupLimits::default(),
            max_dependency_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
            artifact_name: "beacon".to_string(),
            generated_at: None,
        }
    }
}

/// One artifact, rendered but not yet written. Paths are relative to the
/// output directory.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub contents: String,
    pub label: String,
    /// Arena indices of the rules this file contains.
    pub rules: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct CompilationResult {
    pub success: bool,
    /// Absolute paths of everything written, in write order.
    pub files: Vec<PathBuf>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub manifest_path: Option<PathBuf>,
    pub rule_count: usize,
    pub group_count: usize,
}

impl CompilationResult {
    fn failure(errors: Vec<Diagnostic>, warnings: Vec<Diagnostic>) -> Self {
        Self {
            success: false,
            files: Vec::new(),
            errors,
            warnings,
            manifest_path: None,
            rule_count: 0,
            group_count: 0,
        }
    }
}

/// Run the pipeline. Rule-level problems surface as diagnostics in the
/// result, never as `Err`; the result's `success` flag is the contract.
pub fn run(opts: &CompileOptions, mode: PipelineMode) -> CompilationResult {
    let mut warnings: Vec<Diagnostic> = Vec::new();

    // -- configuration ------------------------------------------------------

    if let Some(target) = &opts.target {
        if !KNOWN_TARGETS.contains(&target.as_str()) {
            return CompilationResult::failure(
                vec![
                    Diagnostic::new(Stage::Configuration, format!("unknown target `{target}`"))
                        .with("target", target.clone()),
                ],
                warnings,
            );
        }
    }

    let config = match &opts.config_path {
        Some(path) => match SystemConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                return CompilationResult::failure(
                    vec![
                        Diagnostic::new(Stage::Configuration, format!("{e:#}"))
                            .with("file", path.display().to_string()),
                    ],
                    warnings,
                );
            }
        },
        None => SystemConfig::default(),
    };

    let catalog = match &opts.catalog_path {
        Some(path) => match SensorCatalog::load(path) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                return CompilationResult::failure(
                    vec![
                        Diagnostic::new(Stage::Catalog, format!("{e:#}"))
                            .with("file", path.display().to_string()),
                    ],
                    warnings,
                );
            }
        },
        None => None,
    };

    // -- parse --------------------------------------------------------------

    let rules = match pulsar_lang::load_rules_path(&opts.rules_path) {
        Ok(rules) => rules,
        Err(parse_errors) => {
            return CompilationResult::failure(
                parse_errors.into_iter().map(Diagnostic::from).collect(),
                warnings,
            );
        }
    };
    tracing::debug!(rules = rules.len(), "parsed rule documents");
    if rules.is_empty() {
        warnings.push(Diagnostic::new(
            Stage::Validation,
            "no rules found in the rules path",
        ));
    }

    // -- validate -----------------------------------------------------------

    let known_sensors = known_sensor_set(catalog.as_ref(), &config);
    let outcome = check_rules(&rules, known_sensors.as_ref(), opts.validation_level);
    warnings.extend(outcome.warnings.into_iter().map(Diagnostic::from));
    if !outcome.errors.is_empty() {
        return CompilationResult::failure(
            outcome.errors.into_iter().map(Diagnostic::from).collect(),
            warnings,
        );
    }

    if opts.lint {
        for lint in lint_rules(&rules, Some(config.cycle_time_ms)) {
            if lint.severity >= opts.lint_level {
                warnings.push(
                    Diagnostic::new(Stage::Validation, lint.message.clone())
                        .with("code", lint.code)
                        .with("rule", lint.rule.clone()),
                );
            }
        }
    }

    if mode == PipelineMode::Validate {
        return finish_no_emit(rules.len(), 0, warnings, opts);
    }

    // -- analyze & graph ----------------------------------------------------

    let facts: Vec<RuleFacts> = rules.iter().map(analyze_rule).collect();
    let graph = build_graph(&rules, &facts);

    let cycles = graph.find_cycles();
    if !cycles.is_empty() {
        let errors = cycles.iter().map(|cycle| cycle_diagnostic(cycle)).collect();
        return CompilationResult::failure(errors, warnings);
    }

    for chain in graph.deep_chains(opts.max_dependency_depth) {
        warnings.push(
            Diagnostic::new(
                Stage::Dependency,
                format!(
                    "dependency chain exceeds depth {}: {}",
                    opts.max_dependency_depth,
                    chain.join(" -> ")
                ),
            )
            .with("code", "DeepChain"),
        );
    }

    let layers = graph.layers();
    let groups = partition_groups(&layers, &facts, &opts.group_limits);
    tracing::debug!(groups = groups.len(), "partitioned rule groups");

    if mode == PipelineMode::Check {
        return finish_no_emit(rules.len(), groups.len(), warnings, opts);
    }

    // -- render -------------------------------------------------------------

    let ctx = EmitContext {
        rules: &rules,
        facts: &facts,
        graph: &graph,
        layers: &layers,
        groups: &groups,
        config: &config,
    };

    let source_dir = if mode == PipelineMode::Beacon {
        PathBuf::from("src")
    } else {
        PathBuf::new()
    };

    let mut rendered: Vec<RenderedFile> = Vec::new();
    for group in &groups {
        rendered.push(RenderedFile {
            path: source_dir.join(format!("{}.rs", EmitContext::group_module(group.index))),
            contents: render_group_unit(&ctx, group),
            label: "evaluation-unit".to_string(),
            rules: group.rules.clone(),
        });
    }
    rendered.push(RenderedFile {
        path: source_dir.join("coordinator.rs"),
        contents: render_coordinator(&ctx),
        label: "coordinator".to_string(),
        rules: Vec::new(),
    });
    rendered.push(RenderedFile {
        path: source_dir.join("beacon_metadata.rs"),
        contents: render_metadata(&ctx),
        label: "metadata".to_string(),
        rules: (0..rules.len()).collect(),
    });
    let embedded_config = match render_embedded_config(&ctx) {
        Ok(contents) => contents,
        Err(e) => {
            return CompilationResult::failure(
                vec![Diagnostic::new(Stage::Emission, e.to_string())],
                warnings,
            );
        }
    };
    rendered.push(RenderedFile {
        path: source_dir.join("embedded_config.rs"),
        contents: embedded_config,
        label: "embedded-config".to_string(),
        rules: Vec::new(),
    });

    if mode == PipelineMode::Beacon {
        rendered.push(RenderedFile {
            path: source_dir.join("main.rs"),
            contents: render_beacon_main(&ctx),
            label: "entrypoint".to_string(),
            rules: Vec::new(),
        });
        rendered.push(RenderedFile {
            path: PathBuf::from("Cargo.toml"),
            contents: render_beacon_cargo_toml(&opts.artifact_name),
            label: "package-manifest".to_string(),
            rules: Vec::new(),
        });
    }

    // -- promote warnings before anything touches the disk ------------------

    if opts.fail_on_warnings && !warnings.is_empty() {
        let errors = warnings.clone();
        return CompilationResult::failure(errors, warnings);
    }

    // -- write sweep --------------------------------------------------------

    let write_manifest = match mode {
        PipelineMode::Sources => opts.generate_metadata,
        _ => true,
    };

    let mut written: Vec<PathBuf> = Vec::new();
    if let Err(diag) = prepare_output_dir(&opts.output_dir, opts.clean) {
        return CompilationResult::failure(vec![diag], warnings);
    }
    for file in &rendered {
        let absolute = opts.output_dir.join(&file.path);
        if let Err(diag) = write_file(&absolute, file.contents.as_bytes()) {
            return CompilationResult::failure(vec![diag], warnings);
        }
        written.push(absolute);
    }

    let mut manifest_path = None;
    if write_manifest {
        let generated_at = opts.generated_at.unwrap_or_else(Utc::now);
        let manifest = build_manifest(&ctx, &rendered, generated_at);
        let json = match manifest.to_json() {
            Ok(json) => json,
            Err(e) => {
                return CompilationResult::failure(
                    vec![Diagnostic::new(Stage::Emission, e.to_string())],
                    warnings,
                );
            }
        };
        let absolute = opts.output_dir.join(MANIFEST_FILENAME);
        if let Err(diag) = write_file(&absolute, json.as_bytes()) {
            return CompilationResult::failure(vec![diag], warnings);
        }
        written.push(absolute.clone());
        manifest_path = Some(absolute);
    }

    if opts.emit_sourcemap {
        let sourcemap = build_sourcemap(&ctx);
        match sourcemap.to_json() {
            Ok(json) => {
                let absolute = opts.output_dir.join(SOURCEMAP_FILENAME);
                if let Err(diag) = write_file(&absolute, json.as_bytes()) {
                    return CompilationResult::failure(vec![diag], warnings);
                }
                written.push(absolute);
            }
            Err(e) => {
                return CompilationResult::failure(
                    vec![Diagnostic::new(Stage::Emission, e.to_string())],
                    warnings,
                );
            }
        }
    }

    tracing::info!(
        rules = rules.len(),
        groups = groups.len(),
        files = written.len(),
        "compilation finished"
    );

    CompilationResult {
        success: true,
        files: written,
        errors: Vec::new(),
        warnings,
        manifest_path,
        rule_count: rules.len(),
        group_count: groups.len(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn known_sensor_set(
    catalog: Option<&SensorCatalog>,
    config: &SystemConfig,
) -> Option<BTreeSet<String>> {
    let mut known: Option<BTreeSet<String>> = None;
    if let Some(catalog) = catalog {
        known.get_or_insert_default().extend(catalog.names());
    }
    if let Some(valid) = &config.valid_sensors {
        known.get_or_insert_default().extend(valid.iter().cloned());
    }
    known
}

fn finish_no_emit(
    rule_count: usize,
    group_count: usize,
    warnings: Vec<Diagnostic>,
    opts: &CompileOptions,
) -> CompilationResult {
    if opts.fail_on_warnings && !warnings.is_empty() {
        let errors = warnings.clone();
        return CompilationResult::failure(errors, warnings);
    }
    CompilationResult {
        success: true,
        files: Vec::new(),
        errors: Vec::new(),
        warnings,
        manifest_path: None,
        rule_count,
        group_count,
    }
}

fn prepare_output_dir(dir: &Path, clean: bool) -> Result<(), Diagnostic> {
    if clean && dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| emission_error(dir, "cleaning", e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| emission_error(dir, "creating", e))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), Diagnostic> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| emission_error(parent, "creating", e))?;
    }
    std::fs::write(path, bytes).map_err(|e| emission_error(path, "writing", e))
}

fn emission_error(path: &Path, verb: &str, e: std::io::Error) -> Diagnostic {
    Diagnostic::new(Stage::Emission, format!("{verb} {}: {e}", path.display()))
        .with("file", path.display().to_string())
}
