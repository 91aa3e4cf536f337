//! Rule language front-end: the rule AST, the YAML document parser, the
//! expression grammar, structural validation, and sensor analysis.

pub mod analyze;
pub mod ast;
pub mod checker;
mod expr_parser;
mod parse_utils;
pub mod yaml;

pub use analyze::{RuleFacts, analyze_rule};
pub use checker::{
    Lint, LintSeverity, ValidationError, ValidationLevel, ValidationOutcome, ValidationWarning,
    check_rules, lint_rules,
};
pub use expr_parser::parse_expression;
pub use yaml::{ParseError, load_rules_path, parse_rules_document};
