use serde_yaml::Value;

use crate::ast::*;
use crate::expr_parser::parse_expression;

use super::MAX_NESTING_DEPTH;
use super::document::{field, parse_duration_ms, parse_literal};

/// Parse a `conditions:` block (`all:`/`any:` sequences of condition items)
/// into a group node. At least one of the two branches must be non-empty.
pub(super) fn parse_condition_group(value: &Value, depth: usize) -> Result<ConditionTree, String> {
    if depth > MAX_NESTING_DEPTH {
        return Err(format!(
            "condition nesting exceeds the limit of {MAX_NESTING_DEPTH} (DeeplyNested)"
        ));
    }
    let map = value.as_mapping().ok_or("`conditions` must be a mapping")?;

    let mut all = Vec::new();
    if let Some(items) = field(map, "all") {
        let items = items.as_sequence().ok_or("`all` must be a sequence")?;
        for item in items {
            all.push(parse_condition_item(item, depth + 1)?);
        }
    }
    let mut any = Vec::new();
    if let Some(items) = field(map, "any") {
        let items = items.as_sequence().ok_or("`any` must be a sequence")?;
        for item in items {
            any.push(parse_condition_item(item, depth + 1)?);
        }
    }

    if all.is_empty() && any.is_empty() {
        return Err("`conditions` must have a non-empty `all:` or `any:` list".to_string());
    }
    Ok(ConditionTree::Group { all, any })
}

/// One `- condition: { type: ..., ... }` sequence entry.
fn parse_condition_item(item: &Value, depth: usize) -> Result<ConditionTree, String> {
    let map = item
        .as_mapping()
        .ok_or("condition entry must be a mapping")?;
    let inner = field(map, "condition")
        .ok_or("condition entry must be wrapped under a `condition:` key")?;
    let inner_map = inner.as_mapping().ok_or("`condition` must be a mapping")?;
    let kind = field(inner_map, "type")
        .and_then(Value::as_str)
        .ok_or("condition is missing `type`")?;

    match kind {
        "comparison" => parse_comparison(inner_map),
        "expression" => parse_expression_condition(inner_map),
        "threshold_over_time" => parse_threshold(inner_map),
        "group" => parse_condition_group(inner, depth + 1),
        other => Err(format!("unknown condition type `{other}`")),
    }
}

fn parse_comparison(map: &serde_yaml::Mapping) -> Result<ConditionTree, String> {
    let sensor = field(map, "sensor")
        .and_then(Value::as_str)
        .ok_or("comparison is missing `sensor`")?
        .to_string();
    let op = parse_operator(map)?;
    let value = field(map, "value").ok_or("comparison is missing `value`")?;
    Ok(ConditionTree::Comparison {
        sensor,
        op,
        value: parse_literal(value)?,
    })
}

fn parse_expression_condition(map: &serde_yaml::Mapping) -> Result<ConditionTree, String> {
    let source = field(map, "expression")
        .and_then(Value::as_str)
        .ok_or("expression condition is missing `expression`")?
        .to_string();
    let expr = parse_expression(&source)?;
    Ok(ConditionTree::Expression { source, expr })
}

fn parse_threshold(map: &serde_yaml::Mapping) -> Result<ConditionTree, String> {
    let sensor = field(map, "sensor")
        .and_then(Value::as_str)
        .ok_or("threshold_over_time is missing `sensor`")?
        .to_string();
    let op = parse_operator(map)?;

    // `threshold` is the canonical key; a numerically coercible `value`
    // is promoted when `threshold` is absent.
    let threshold = match field(map, "threshold") {
        Some(v) => numeric(v).ok_or("`threshold` must be a number")?,
        None => match field(map, "value") {
            Some(v) => numeric(v)
                .ok_or("threshold_over_time `value` is not numerically coercible")?,
            None => return Err("threshold_over_time is missing `threshold`".to_string()),
        },
    };

    let duration = field(map, "duration").ok_or("threshold_over_time is missing `duration`")?;
    let duration_ms = parse_duration_ms(duration)?;
    if duration_ms == 0 {
        return Err("threshold_over_time `duration` must be positive".to_string());
    }

    let mode = match field(map, "mode").and_then(Value::as_str) {
        None | Some("strict") => TemporalMode::Strict,
        Some("extended") => TemporalMode::Extended,
        Some(other) => return Err(format!("unknown temporal mode `{other}`")),
    };

    Ok(ConditionTree::TemporalThreshold {
        sensor,
        op,
        threshold,
        duration_ms,
        mode,
    })
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_operator(map: &serde_yaml::Mapping) -> Result<CmpOp, String> {
    let lexeme = field(map, "operator")
        .and_then(Value::as_str)
        .ok_or("condition is missing `operator`")?;
    comparison_op(lexeme).ok_or_else(|| format!("unknown operator `{lexeme}`"))
}

/// Operator lexemes: canonical symbols plus spelled and abbreviated forms.
pub(super) fn comparison_op(lexeme: &str) -> Option<CmpOp> {
    Some(match lexeme {
        ">" | "greater_than" | "gt" => CmpOp::Gt,
        "<" | "less_than" | "lt" => CmpOp::Lt,
        ">=" | "greater_than_or_equal" | "gte" => CmpOp::Ge,
        "<=" | "less_than_or_equal" | "lte" => CmpOp::Le,
        "==" | "equal_to" | "eq" => CmpOp::Eq,
        "!=" | "not_equal_to" | "ne" => CmpOp::Ne,
        _ => return None,
    })
}
