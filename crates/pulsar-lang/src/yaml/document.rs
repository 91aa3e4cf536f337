use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::ast::*;

use super::scan::{find_duplicate_key, rule_name_lines};
use super::{MAX_NESTING_DEPTH, ParseError};

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse a single rule document. Document-level failures (unreadable YAML,
/// duplicate keys, missing `rules:` root, excessive nesting) produce one
/// error; per-rule failures are accumulated so every broken rule is
/// reported in one pass.
pub fn parse_rules_document(text: &str, file_label: &str) -> Result<Vec<Rule>, Vec<ParseError>> {
    if let Some((line, key)) = find_duplicate_key(text) {
        return Err(vec![ParseError::new(
            file_label,
            line,
            format!("duplicate mapping key `{key}`"),
        )]);
    }

    let doc: Value = serde_yaml::from_str(text).map_err(|e| {
        let line = e.location().map(|l| l.line()).unwrap_or(1);
        vec![ParseError::new(file_label, line, format!("invalid YAML: {e}"))]
    })?;

    if value_depth(&doc) > MAX_NESTING_DEPTH {
        return Err(vec![ParseError::new(
            file_label,
            1,
            format!("document nesting exceeds the limit of {MAX_NESTING_DEPTH} (DeeplyNested)"),
        )]);
    }

    let root = doc.as_mapping().ok_or_else(|| {
        vec![ParseError::new(
            file_label,
            1,
            "document root must be a mapping with a `rules:` sequence",
        )]
    })?;
    let items = field(root, "rules")
        .and_then(Value::as_sequence)
        .ok_or_else(|| {
            vec![ParseError::new(
                file_label,
                1,
                "missing top-level `rules:` sequence",
            )]
        })?;

    let name_lines = rule_name_lines(text);
    let mut rules = Vec::new();
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let line = name_lines.get(index).copied().unwrap_or(1);
        let provenance = Provenance {
            file: file_label.to_string(),
            line,
        };
        match parse_rule(item, provenance) {
            Ok(rule) => rules.push(rule),
            Err(reason) => errors.push(ParseError::new(file_label, line, reason)),
        }
    }

    if errors.is_empty() { Ok(rules) } else { Err(errors) }
}

/// Load rules from a file, or from every `*.yaml` file under a directory
/// (recursive, case-sensitive lexicographic order). Any file failing to
/// parse fails the whole load; errors from all files are accumulated.
pub fn load_rules_path(path: &Path) -> Result<Vec<Rule>, Vec<ParseError>> {
    let mut files = Vec::new();
    if path.is_dir() {
        collect_yaml_files(path, &mut files)
            .map_err(|e| vec![ParseError::new(&path.display().to_string(), 1, e)])?;
    } else {
        files.push(path.to_path_buf());
    }

    let mut rules = Vec::new();
    let mut errors = Vec::new();
    for file in &files {
        let label = file.display().to_string();
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                errors.push(ParseError::new(&label, 1, format!("cannot read file: {e}")));
                continue;
            }
        };
        match parse_rules_document(&text, &label) {
            Ok(parsed) => rules.extend(parsed),
            Err(parse_errors) => errors.extend(parse_errors),
        }
    }

    if errors.is_empty() { Ok(rules) } else { Err(errors) }
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<(), String> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| format!("cannot read directory: {e}"))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();
    for entry in entries {
        if entry.is_dir() {
            collect_yaml_files(&entry, out)?;
        } else if entry.extension().is_some_and(|ext| ext == "yaml") {
            out.push(entry);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn parse_rule(item: &Value, provenance: Provenance) -> Result<Rule, String> {
    let map = item.as_mapping().ok_or("rule entry must be a mapping")?;

    let name = field(map, "name")
        .and_then(Value::as_str)
        .ok_or("rule is missing `name`")?
        .to_string();
    let description = field(map, "description")
        .and_then(Value::as_str)
        .map(str::to_string);

    let conditions = field(map, "conditions").ok_or("rule is missing `conditions`")?;
    let condition = super::condition::parse_condition_group(conditions, 0)?;

    let actions = field(map, "actions")
        .and_then(Value::as_sequence)
        .ok_or("rule is missing `actions`")?;
    if actions.is_empty() {
        return Err("rule must have at least one action".to_string());
    }
    let actions = actions
        .iter()
        .map(super::action::parse_action)
        .collect::<Result<Vec<_>, _>>()?;

    let else_actions = match field(map, "else") {
        Some(else_value) => {
            let else_map = else_value.as_mapping().ok_or("`else` must be a mapping")?;
            field(else_map, "actions")
                .and_then(Value::as_sequence)
                .ok_or("`else` must carry an `actions:` sequence")?
                .iter()
                .map(super::action::parse_action)
                .collect::<Result<Vec<_>, _>>()?
        }
        None => Vec::new(),
    };

    let inputs = match field(map, "inputs") {
        Some(inputs_value) => inputs_value
            .as_sequence()
            .ok_or("`inputs` must be a sequence")?
            .iter()
            .map(parse_input_binding)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(Rule {
        name,
        description,
        condition,
        actions,
        else_actions,
        inputs,
        provenance,
    })
}

// ---------------------------------------------------------------------------
// Input bindings
// ---------------------------------------------------------------------------

fn parse_input_binding(item: &Value) -> Result<InputBinding, String> {
    let map = item.as_mapping().ok_or("input binding must be a mapping")?;
    let sensor = field(map, "id")
        .and_then(Value::as_str)
        .ok_or("input binding is missing `id`")?
        .to_string();
    let required = field(map, "required").and_then(Value::as_bool).unwrap_or(true);

    let fallback = match field(map, "fallback") {
        Some(fb) => {
            let fb_map = fb.as_mapping().ok_or("`fallback` must be a mapping")?;
            let strategy = field(fb_map, "strategy")
                .and_then(Value::as_str)
                .ok_or("fallback is missing `strategy`")?;
            match strategy {
                "use_default" => {
                    let default = field(fb_map, "default_value")
                        .ok_or("use_default fallback requires `default_value`")?;
                    FallbackPolicy::UseDefault(parse_literal(default)?)
                }
                "use_last_known" => {
                    let max_age_ms = field(fb_map, "max_age")
                        .map(parse_duration_ms)
                        .transpose()?;
                    FallbackPolicy::UseLastKnown { max_age_ms }
                }
                "propagate_unavailable" => FallbackPolicy::PropagateUnavailable,
                "skip_rule" => FallbackPolicy::SkipRule,
                other => return Err(format!("unknown fallback strategy `{other}`")),
            }
        }
        None => FallbackPolicy::PropagateUnavailable,
    };

    Ok(InputBinding {
        sensor,
        required,
        fallback,
    })
}

/// Duration as an integer millisecond count or a `"5s"`/`"2m"`/`"1h"`
/// suffixed string.
pub(super) fn parse_duration_ms(value: &Value) -> Result<u64, String> {
    if let Some(ms) = value.as_u64() {
        return Ok(ms);
    }
    let text = value
        .as_str()
        .ok_or("duration must be an integer millisecond count or a suffixed string")?;
    let (digits, factor) = if let Some(d) = text.strip_suffix("ms") {
        (d, 1)
    } else if let Some(d) = text.strip_suffix('s') {
        (d, 1_000)
    } else if let Some(d) = text.strip_suffix('m') {
        (d, 60_000)
    } else if let Some(d) = text.strip_suffix('h') {
        (d, 3_600_000)
    } else {
        (text, 1)
    };
    let n: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration `{text}`"))?;
    Ok(n * factor)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(super) fn field<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(Value::String(key.to_string()))
}

pub(super) fn parse_literal(value: &Value) -> Result<Literal, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(Literal::Number)
            .ok_or_else(|| format!("unrepresentable number `{n}`")),
        Value::Bool(b) => Ok(Literal::Bool(*b)),
        Value::String(s) => Ok(Literal::Str(s.clone())),
        other => Err(format!("expected a number, bool or string, got {other:?}")),
    }
}

fn value_depth(value: &Value) -> usize {
    match value {
        Value::Sequence(seq) => 1 + seq.iter().map(value_depth).max().unwrap_or(0),
        Value::Mapping(map) => 1 + map.values().map(value_depth).max().unwrap_or(0),
        Value::Tagged(tagged) => 1 + value_depth(&tagged.value),
        _ => 0,
    }
}
