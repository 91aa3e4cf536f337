use std::path::PathBuf;

use serde::Deserialize;

/// Logging configuration. All fields have defaults so the section may be
/// omitted entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level filter (e.g. `"info"`, `"debug"`).
    pub level: String,
    /// Optional file path for log output.
    pub file: Option<PathBuf>,
    /// Output format: `plain` (human-readable) or `json` (structured).
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: LogFormat::Plain,
        }
    }
}

impl LoggingConfig {
    /// Derive the CLI's logging setup from the system config plus
    /// verbosity flags; `--debug` wins over `--verbose`.
    pub fn from_system(level: &str, file: Option<PathBuf>, verbose: bool, debug: bool) -> Self {
        let level = if debug {
            "debug".to_string()
        } else if verbose {
            "info".to_string()
        } else {
            level.to_string()
        };
        Self {
            level,
            file,
            format: LogFormat::Plain,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}
