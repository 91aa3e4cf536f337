//! End-to-end pipeline scenarios over real rule documents.

use std::path::Path;

use chrono::DateTime;
use pulsar_codegen::pipeline::{CompileOptions, PipelineMode, run};
use pulsar_codegen::{MANIFEST_FILENAME, content_hash};
use pulsar_core::Stage;

fn write_rules(dir: &Path, doc: &str) -> std::path::PathBuf {
    let path = dir.join("rules.yaml");
    std::fs::write(&path, doc).unwrap();
    path
}

fn options(rules: &Path, out: &Path) -> CompileOptions {
    let mut opts = CompileOptions::new(rules, out);
    opts.generated_at = DateTime::from_timestamp(1_700_000_000, 0);
    opts
}

fn manifest_json(out: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(out.join(MANIFEST_FILENAME)).unwrap();
    serde_json::from_str(&text).unwrap()
}

const SIMPLE_THRESHOLD: &str = r#"
rules:
  - name: HighTemp
    description: alert when hot
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

const DEPENDENT_RULES: &str = r#"
rules:
  - name: Normalize
    description: normalize temperature
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
    description: escalate on high norm
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

// ---------------------------------------------------------------------------
// Scenario: simple threshold
// ---------------------------------------------------------------------------

#[test]
fn simple_threshold_compiles_to_one_layer_zero_group() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), SIMPLE_THRESHOLD);
    let out = dir.path().join("out");

    let result = run(&options(&rules, &out), PipelineMode::Compile);
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.rule_count, 1);
    assert_eq!(result.group_count, 1);

    let manifest = manifest_json(&out);
    let rule = &manifest["rules"]["HighTemp"];
    assert_eq!(rule["layer"], 0);
    assert_eq!(rule["temporal"], false);
    assert_eq!(rule["dependencies"], serde_json::json!([]));
    assert_eq!(rule["input_sensors"], serde_json::json!(["input:temperature"]));
    assert_eq!(rule["output_sensors"], serde_json::json!(["output:alert"]));

    let unit = std::fs::read_to_string(out.join("g_0.rs")).unwrap();
    assert!(unit.contains("pub const LAYER: usize = 0;"));
    assert!(unit.contains("\"input:temperature\""));
    assert!(unit.contains("CmpOp::Gt"));
}

// ---------------------------------------------------------------------------
// Scenario: dependent rules
// ---------------------------------------------------------------------------

#[test]
fn dependent_rules_land_in_two_groups() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), DEPENDENT_RULES);
    let out = dir.path().join("out");

    let result = run(&options(&rules, &out), PipelineMode::Compile);
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.group_count, 2);

    let manifest = manifest_json(&out);
    assert_eq!(manifest["rules"]["Normalize"]["layer"], 0);
    assert_eq!(manifest["rules"]["Escalate"]["layer"], 1);
    assert_eq!(
        manifest["rules"]["Escalate"]["dependencies"],
        serde_json::json!(["Normalize"])
    );

    let coordinator = std::fs::read_to_string(out.join("coordinator.rs")).unwrap();
    let g0_call = coordinator.find("g_0::evaluate").unwrap();
    let g1_call = coordinator.find("g_1::evaluate").unwrap();
    assert!(g0_call < g1_call, "groups must run in layer order");
}

// ---------------------------------------------------------------------------
// Scenario: cycle rejection
// ---------------------------------------------------------------------------

#[test]
fn cycle_is_rejected_with_the_full_ring_and_no_files() {
    let doc = r#"
rules:
  - name: A
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: output:b
            operator: ">"
            value: 0
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
            sensor: output:a
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: output:b
          value: 1
"#;
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), doc);
    let out = dir.path().join("out");

    let result = run(&options(&rules, &out), PipelineMode::Compile);
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].stage, Stage::Dependency);
    assert!(result.errors[0].message.contains("A -> B -> A"));
    assert!(!out.exists(), "failed compilations must write nothing");
}

// ---------------------------------------------------------------------------
// Scenario: duplicate writer rejection
// ---------------------------------------------------------------------------

#[test]
fn duplicate_writer_is_rejected_naming_both_rules() {
    let doc = r#"
rules:
  - name: First
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: input:a
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
            sensor: input:b
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: output:x
          value: 2
"#;
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), doc);
    let out = dir.path().join("out");

    let result = run(&options(&rules, &out), PipelineMode::Compile);
    assert!(!result.success);
    assert_eq!(result.errors[0].stage, Stage::Validation);
    assert!(result.errors[0].message.contains("output:x"));
    assert!(result.errors[0].message.contains("First"));
    assert!(result.errors[0].message.contains("Second"));
    assert!(!out.exists());
}

// ---------------------------------------------------------------------------
// Scenario: temporal threshold emission
// ---------------------------------------------------------------------------

#[test]
fn temporal_rule_is_flagged_and_emitted_with_tracker_parameters() {
    let doc = r#"
rules:
  - name: SustainedHot
    description: sustained heat
    conditions:
      all:
        - condition:
            type: threshold_over_time
            sensor: input:temp
            operator: ">"
            threshold: 75
            duration: 10000
    actions:
      - set_value:
          key: output:sustained
          value: true
"#;
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), doc);
    let out = dir.path().join("out");

    let result = run(&options(&rules, &out), PipelineMode::Compile);
    assert!(result.success, "errors: {:?}", result.errors);

    let manifest = manifest_json(&out);
    let rule = &manifest["rules"]["SustainedHot"];
    assert_eq!(rule["temporal"], true);
    assert_eq!(rule["dependencies"], serde_json::json!([]));

    // The evaluation unit carries the tracker key parameters.
    let unit = std::fs::read_to_string(out.join("g_0.rs")).unwrap();
    assert!(unit.contains("ConditionTree::TemporalThreshold"));
    assert!(unit.contains("\"input:temp\""));
    assert!(unit.contains("threshold: 75f64"));
    assert!(unit.contains("duration_ms: 10000"));
    assert!(unit.contains("TemporalMode::Strict"));
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn identical_inputs_produce_identical_files_and_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), DEPENDENT_RULES);
    let out_a = dir.path().join("out-a");
    let out_b = dir.path().join("out-b");

    let first = run(&options(&rules, &out_a), PipelineMode::Compile);
    let second = run(&options(&rules, &out_b), PipelineMode::Compile);
    assert!(first.success && second.success);

    let names = |result: &pulsar_codegen::CompilationResult| -> Vec<String> {
        result
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    };
    assert_eq!(names(&first), names(&second));

    for (a, b) in first.files.iter().zip(second.files.iter()) {
        let bytes_a = std::fs::read(a).unwrap();
        let bytes_b = std::fs::read(b).unwrap();
        assert_eq!(
            content_hash(&bytes_a),
            content_hash(&bytes_b),
            "{} differs between runs",
            a.display()
        );
    }
}

// ---------------------------------------------------------------------------
// Manifest completeness
// ---------------------------------------------------------------------------

#[test]
fn manifest_records_every_rule_and_matching_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), DEPENDENT_RULES);
    let out = dir.path().join("out");

    let result = run(&options(&rules, &out), PipelineMode::Compile);
    assert!(result.success);

    let manifest = manifest_json(&out);
    let rule_map = manifest["rules"].as_object().unwrap();
    assert_eq!(rule_map.len(), 2);
    assert!(rule_map.contains_key("Normalize"));
    assert!(rule_map.contains_key("Escalate"));

    let files = manifest["files"].as_array().unwrap();
    // Two groups + coordinator + metadata + embedded config.
    assert_eq!(files.len(), 5);
    for file in files {
        let path = out.join(file["path"].as_str().unwrap());
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(
            file["hash"].as_str().unwrap(),
            content_hash(&bytes),
            "hash mismatch for {}",
            path.display()
        );
    }

    assert_eq!(manifest["schema_version"], "1.0");
    assert_eq!(manifest["build_metrics"]["total_rules"], 2);
    assert_eq!(manifest["dependency_analysis"]["max_depth"], 1);
    assert_eq!(
        manifest["dependency_analysis"]["sensor_dependencies"]["output:norm"],
        serde_json::json!(["Escalate"])
    );
}

// ---------------------------------------------------------------------------
// Modes & options
// ---------------------------------------------------------------------------

#[test]
fn validate_mode_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), SIMPLE_THRESHOLD);
    let out = dir.path().join("out");

    let result = run(&options(&rules, &out), PipelineMode::Validate);
    assert!(result.success);
    assert!(result.files.is_empty());
    assert!(!out.exists());
}

#[test]
fn generate_mode_skips_the_manifest_unless_asked() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), SIMPLE_THRESHOLD);

    let out = dir.path().join("out");
    let result = run(&options(&rules, &out), PipelineMode::Sources);
    assert!(result.success);
    assert!(!out.join(MANIFEST_FILENAME).exists());

    let out_with = dir.path().join("out-with");
    let mut opts = options(&rules, &out_with);
    opts.generate_metadata = true;
    let result = run(&opts, PipelineMode::Sources);
    assert!(result.success);
    assert!(out_with.join(MANIFEST_FILENAME).exists());
}

#[test]
fn beacon_mode_packages_a_crate() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), DEPENDENT_RULES);
    let out = dir.path().join("artifact");

    let result = run(&options(&rules, &out), PipelineMode::Beacon);
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(out.join("Cargo.toml").exists());
    assert!(out.join("src/main.rs").exists());
    assert!(out.join("src/g_0.rs").exists());
    assert!(out.join("src/coordinator.rs").exists());
    assert!(out.join(MANIFEST_FILENAME).exists());

    let main = std::fs::read_to_string(out.join("src/main.rs")).unwrap();
    assert!(main.contains("mod g_0;"));
    assert!(main.contains("coordinator::run_cycle"));
}

#[test]
fn fail_on_warnings_promotes_and_blocks_writes() {
    // Missing descriptions produce warnings.
    let doc = r#"
rules:
  - name: Quiet
    conditions:
      all:
        - condition:
            type: comparison
            sensor: input:a
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: output:x
          value: 1
"#;
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), doc);
    let out = dir.path().join("out");

    let mut opts = options(&rules, &out);
    opts.fail_on_warnings = true;
    let result = run(&opts, PipelineMode::Compile);
    assert!(!result.success);
    assert!(!result.errors.is_empty());
    assert!(!out.exists());
}

#[test]
fn unknown_target_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), SIMPLE_THRESHOLD);
    let out = dir.path().join("out");

    let mut opts = options(&rules, &out);
    opts.target = Some("mainframe".to_string());
    let result = run(&opts, PipelineMode::Compile);
    assert!(!result.success);
    assert_eq!(result.errors[0].stage, Stage::Configuration);
}

#[test]
fn sourcemap_is_emitted_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_rules(dir.path(), DEPENDENT_RULES);
    let out = dir.path().join("out");

    let mut opts = options(&rules, &out);
    opts.emit_sourcemap = true;
    let result = run(&opts, PipelineMode::Compile);
    assert!(result.success);

    let text = std::fs::read_to_string(out.join("rules.sourcemap.json")).unwrap();
    let map: serde_json::Value = serde_json::from_str(&text).unwrap();
    let entries = map["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["rule"], "Normalize");
    assert_eq!(entries[0]["emitted_file"], "g_0.rs");
    assert_eq!(entries[1]["rule"], "Escalate");
    assert_eq!(entries[1]["emitted_file"], "g_1.rs");
}

#[test]
fn directory_input_is_loaded_in_lexicographic_order() {
    let dir = tempfile::tempdir().unwrap();
    let rules_dir = dir.path().join("rules");
    std::fs::create_dir_all(&rules_dir).unwrap();
    // b.yaml depends on a.yaml's output; file order must not matter for
    // correctness, and loading order must be stable.
    std::fs::write(
        rules_dir.join("b.yaml"),
        r#"
rules:
  - name: Consumer
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: output:base
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: output:final
          value: 1
"#,
    )
    .unwrap();
    std::fs::write(
        rules_dir.join("a.yaml"),
        r#"
rules:
  - name: Producer
    description: d
    conditions:
      all:
        - condition:
            type: comparison
            sensor: input:seed
            operator: ">"
            value: 0
    actions:
      - set_value:
          key: output:base
          value: 1
"#,
    )
    .unwrap();

    let out = dir.path().join("out");
    let result = run(&options(&rules_dir, &out), PipelineMode::Compile);
    assert!(result.success, "errors: {:?}", result.errors);

    let manifest = manifest_json(&out);
    assert_eq!(manifest["rules"]["Producer"]["layer"], 0);
    assert_eq!(manifest["rules"]["Consumer"]["layer"], 1);
    assert!(
        manifest["rules"]["Producer"]["source_file"]
            .as_str()
            .unwrap()
            .ends_with("a.yaml")
    );
}
