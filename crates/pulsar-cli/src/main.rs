use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

mod cmd_beacon;
mod cmd_compile;
mod cmd_generate;
mod cmd_helpers;
mod cmd_init;
mod cmd_validate;
mod tracing_init;

#[derive(Parser)]
#[command(name = "pulsar", about = "Pulsar AOT rules compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every compiling verb.
#[derive(Args, Clone)]
struct CommonOpts {
    /// Rules file or directory of *.yaml rule documents
    #[arg(long)]
    rules: PathBuf,

    /// System configuration document
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sensor catalog document
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Output directory for emitted artifacts
    #[arg(long, default_value = "beacon-out")]
    output: PathBuf,

    /// Target runtime id
    #[arg(long)]
    target: Option<String>,

    /// How strictly unknown sensors are treated: strict|normal|relaxed
    #[arg(long, default_value = "normal")]
    validation_level: String,

    /// Run advisory lints
    #[arg(long)]
    lint: bool,

    /// Promote accumulated warnings to errors at pipeline end
    #[arg(long)]
    fail_on_warnings: bool,

    /// Minimum lint severity to report: info|warn|error
    #[arg(long, default_value = "warn")]
    lint_level: String,

    /// In `generate` mode, also write the manifest
    #[arg(long)]
    generate_metadata: bool,

    /// Write a rules.sourcemap.json sidecar
    #[arg(long)]
    emit_sourcemap: bool,

    /// Informational logging
    #[arg(long)]
    verbose: bool,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    /// Empty the output directory before writing
    #[arg(long)]
    clean: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile rules into Beacon sources plus a manifest
    Compile(CommonOpts),
    /// Parse and validate rules without emitting anything
    Validate(CommonOpts),
    /// Full pipeline into a deployable Beacon artifact directory
    Beacon(CommonOpts),
    /// Emit sources without packaging extras
    Generate(CommonOpts),
    /// Validator plus analysis sanity checks, no emission
    Test(CommonOpts),
    /// Scaffold a new rules project
    Init {
        /// Project directory to create
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Usage errors and --help/--version both land here; only the
            // former is a failure.
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let outcome = match cli.command {
        Commands::Compile(opts) => cmd_compile::run(opts),
        Commands::Validate(opts) => cmd_validate::run(opts),
        Commands::Beacon(opts) => cmd_beacon::run(opts),
        Commands::Generate(opts) => cmd_generate::run(opts),
        Commands::Test(opts) => cmd_test::run(opts),
        Commands::Init { path } => cmd_init::run(path),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
