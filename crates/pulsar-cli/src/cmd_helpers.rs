//! Shared plumbing for the compiling verbs: option conversion, tracing
//! setup, and diagnostic reporting.

use std::str::FromStr;

use pulsar_codegen::pipeline::{CompilationResult, CompileOptions, PipelineMode};
use pulsar_config::{LoggingConfig, SystemConfig};
use pulsar_lang::{LintSeverity, ValidationLevel};

use crate::CommonOpts;
use crate::tracing_init::init_tracing;

/// Convert CLI options into pipeline options and initialize logging from
/// the system config plus verbosity flags.
pub(crate) fn build_options(opts: &CommonOpts) -> anyhow::Result<CompileOptions> {
    let validation_level = ValidationLevel::from_str(&opts.validation_level)
        .map_err(|e| anyhow::anyhow!("--validation-level: {e}"))?;
    let lint_level = LintSeverity::from_str(&opts.lint_level)
        .map_err(|e| anyhow::anyhow!("--lint-level: {e}"))?;

    // The config is loaded again inside the pipeline (where failures are
    // proper diagnostics); this early peek only drives logging.
    let log_defaults = opts
        .config
        .as_ref()
        .and_then(|path| SystemConfig::load(path).ok())
        .unwrap_or_default();
    let logging = LoggingConfig::from_system(
        &log_defaults.log_level,
        log_defaults.log_file.clone(),
        opts.verbose,
        opts.debug,
    );
    init_tracing(&logging)?;

    let mut compile = CompileOptions::new(&opts.rules, &opts.output);
    compile.config_path = opts.config.clone();
    compile.catalog_path = opts.catalog.clone();
    compile.target = opts.target.clone();
    compile.validation_level = validation_level;
    compile.lint = opts.lint;
    compile.lint_level = lint_level;
    compile.fail_on_warnings = opts.fail_on_warnings;
    compile.generate_metadata = opts.generate_metadata;
    compile.emit_sourcemap = opts.emit_sourcemap;
    compile.clean = opts.clean;
    Ok(compile)
}

/// Run one pipeline mode and report the outcome. Every error prints once,
/// human-readable, with its taxonomy tag; failure exits non-zero.
pub(crate) fn run_pipeline(opts: &CommonOpts, mode: PipelineMode) -> anyhow::Result<()> {
    let compile = build_options(opts)?;
    tracing::debug!(rules = %compile.rules_path.display(), ?mode, "starting pipeline");
    let result = pulsar_codegen::pipeline::run(&compile, mode);
    report(&result)
}

fn report(result: &CompilationResult) -> anyhow::Result<()> {
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    for error in &result.errors {
        eprintln!("{error}");
    }

    if !result.success {
        anyhow::bail!("compilation failed with {} error(s)", result.errors.len());
    }

    if result.files.is_empty() {
        println!(
            "{} rule(s) OK ({} warning(s))",
            result.rule_count,
            result.warnings.len()
        );
    } else {
        println!(
            "{} rule(s) in {} group(s) -> {} file(s)",
            result.rule_count,
            result.group_count,
            result.files.len()
        );
        for file in &result.files {
            println!("  {}", file.display());
        }
    }
    Ok(())
}
