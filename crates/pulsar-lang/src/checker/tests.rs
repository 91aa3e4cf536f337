use std::collections::BTreeSet;

use crate::checker::{ValidationLevel, check_rules, lint_rules};
use crate::yaml::parse_rules_document;

fn parse(doc: &str) -> Vec<crate::ast::Rule> {
    parse_rules_document(doc, "rules.yaml").expect("document should parse")
}

const VALID_DOC: &str = r#"
rules:
  - name: HighTemp
    description: ok
    conditions:
      all:
        - condition:
            type: comparison
            sensor: input:temperature
            operator: ">"
            value: 30
    actions:
      - set_value:
          key: output:alert
          value: true
"#;

#[test]
fn valid_rule_passes() {
    let rules = parse(VALID_DOC);
    let outcome = check_rules(&rules, None, ValidationLevel::Normal);
    assert!(outcome.is_clean(), "unexpected errors: {:?}", outcome.errors);
    assert!(outcome.warnings.is_empty());
}

#[test]
fn missing_description_is_a_warning_not_an_error() {
    let doc = r#"
rules:
  - name: R
    conditions:
      all:
        - condition:
            type: comparison
            sensor: s
            operator: ">"
            value: 0
    actions:
      - log:
          message: x
"#;
    let outcome = check_rules(&parse(doc), None, ValidationLevel::Normal);
    assert!(outcome.is_clean());
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].code, "W001");
}

#[test]
fn empty_sensor_and_empty_key_are_errors() {
    let doc = r#"
rules:
  - name: R
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: ""
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: ""
          value: 1
"#;
    let outcome = check_rules(&parse(doc), None, ValidationLevel::Normal);
    let codes: Vec<_> = outcome.errors.iter().map(|e| e.code).collect();
    assert!(codes.contains(&"V004"));
    assert!(codes.contains(&"V006"));
}

#[test]
fn set_without_value_or_expression_is_an_error() {
    let doc = r#"
rules:
  - name: R
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: s
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: output:x
"#;
    let outcome = check_rules(&parse(doc), None, ValidationLevel::Normal);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].code, "V007");
}

#[test]
fn send_message_needs_message_or_expression() {
    let doc = r#"
rules:
  - name: R
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: s
            operator: ">"
            value: 0
    actions:
      - send_message:
          channel: alerts
"#;
    let outcome = check_rules(&parse(doc), None, ValidationLevel::Normal);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].code, "V009");
}

#[test]
fn duplicate_writer_names_both_rules_and_the_key() {
    let doc = r#"
rules:
  - name: First
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: a
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: output:x
          value: 1
  - name: Second
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: b
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: output:x
          value: 2
"#;
    let outcome = check_rules(&parse(doc), None, ValidationLevel::Normal);
    assert_eq!(outcome.errors.len(), 1);
    let error = &outcome.errors[0];
    assert_eq!(error.code, "V020");
    assert!(error.message.contains("output:x"));
    assert!(error.message.contains("First"));
    assert!(error.message.contains("Second"));
}

#[test]
fn unused_input_binding_is_a_warning() {
    let doc = r#"
rules:
  - name: R
    description: d
    inputs:
      - id: input:never_read
    conditions:
      all:
        - condition:
            type: comparison
            sensor: input:temperature
            operator: ">"
            value: 0
    actions:
      - log:
          message: x
"#;
    let outcome = check_rules(&parse(doc), None, ValidationLevel::Normal);
    assert!(outcome.is_clean());
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].code, "W003");
}

// -----------------------------------------------------------------------
// Catalog levels
// -----------------------------------------------------------------------

fn catalog(entries: &[&str]) -> BTreeSet<String> {
    entries.iter().map(|s| s.to_string()).collect()
}

#[test]
fn unknown_sensor_is_an_error_under_strict() {
    let rules = parse(VALID_DOC);
    let known = catalog(&["input:pressure"]);
    let outcome = check_rules(&rules, Some(&known), ValidationLevel::Strict);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].code, "V021");
}

#[test]
fn unknown_sensor_is_a_warning_under_normal() {
    let rules = parse(VALID_DOC);
    let known = catalog(&["input:pressure"]);
    let outcome = check_rules(&rules, Some(&known), ValidationLevel::Normal);
    assert!(outcome.is_clean());
    assert!(outcome.warnings.iter().any(|w| w.code == "W004"));
}

#[test]
fn unknown_sensor_is_ignored_under_relaxed() {
    let rules = parse(VALID_DOC);
    let known = catalog(&["input:pressure"]);
    let outcome = check_rules(&rules, Some(&known), ValidationLevel::Relaxed);
    assert!(outcome.is_clean());
    assert!(outcome.warnings.is_empty());
}

#[test]
fn rule_written_sensors_do_not_need_cataloguing() {
    let doc = r#"
rules:
  - name: Normalize
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: input:temperature
            operator: ">"
            value: 20
    actions:
      - set_value:
          key: output:norm
          value_expression: "input:temperature / 100"
  - name: Escalate
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: output:norm
            operator: ">"
            value: 0.25
    actions:
      - set_value:
          key: output:alert_level
          value_expression: "output:norm * 10"
"#;
    let rules = parse(doc);
    let known = catalog(&["input:temperature"]);
    let outcome = check_rules(&rules, Some(&known), ValidationLevel::Strict);
    assert!(outcome.is_clean(), "unexpected errors: {:?}", outcome.errors);
}

// -----------------------------------------------------------------------
// Lints
// -----------------------------------------------------------------------

#[test]
fn constant_condition_lint() {
    let doc = r#"
rules:
  - name: Constant
    description: d
    conditions:
      all:
        - condition:
            type: expression
            expression: "1 + 1 > 1"
    actions:
      - log:
          message: x
"#;
    let lints = lint_rules(&parse(doc), None);
    assert!(lints.iter().any(|l| l.code == "L001"));
}

#[test]
fn short_window_lint_requires_cycle_time() {
    let doc = r#"
rules:
  - name: R
    description: d
    conditions:
      all:
        - condition:
            type: threshold_over_time
            sensor: s
            operator: ">"
            threshold: 1
            duration: 50
    actions:
      - log:
          message: x
"#;
    let rules = parse(doc);
    assert!(lint_rules(&rules, None).iter().all(|l| l.code != "L003"));
    assert!(
        lint_rules(&rules, Some(100))
            .iter()
            .any(|l| l.code == "L003")
    );
}

#[test]
fn identical_condition_trees_lint() {
    let doc = r#"
rules:
  - name: A
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: s
            operator: ">"
            value: 1
    actions:
      - set_value:
          key: output:a
          value: 1
  - name: B
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: s
            operator: ">"
            value: 1
    actions:
      - set_value:
          key: output:b
          value: 1
"#;
    let lints = lint_rules(&parse(doc), None);
    let dup: Vec<_> = lints.iter().filter(|l| l.code == "L004").collect();
    assert_eq!(dup.len(), 1);
    assert_eq!(dup[0].rule, "B");
    assert!(dup[0].message.contains("`A`"));
}
