use serde_yaml::Value;

use crate::ast::*;
use crate::expr_parser::parse_expression;

use super::document::{field, parse_literal};

/// One `actions:` sequence entry: a mapping carrying exactly one of the
/// action discriminator keys plus an optional sibling `emit:`.
pub(super) fn parse_action(item: &Value) -> Result<Action, String> {
    let map = item.as_mapping().ok_or("action entry must be a mapping")?;

    let emit = parse_emit_mode(map)?;
    let mut found = Vec::new();
    for key in ["set_value", "send_message", "buffer", "log"] {
        if field(map, key).is_some() {
            found.push(key);
        }
    }
    let discriminator = match found.as_slice() {
        [one] => *one,
        [] => {
            return Err(
                "action must be one of `set_value`, `send_message`, `buffer`, `log`".to_string(),
            );
        }
        many => return Err(format!("action carries multiple variants: {many:?}")),
    };

    let body = field(map, discriminator)
        .and_then(Value::as_mapping)
        .ok_or_else(|| format!("`{discriminator}` must be a mapping"))?;

    match discriminator {
        "set_value" => {
            let key = field(body, "key")
                .and_then(Value::as_str)
                .ok_or("set_value is missing `key`")?
                .to_string();
            let value = field(body, "value").map(parse_literal).transpose()?;
            let expr = parse_optional_expr(body, "value_expression")?;
            Ok(Action::Set {
                key,
                value,
                expr,
                emit,
            })
        }
        "send_message" => {
            let channel = field(body, "channel")
                .and_then(Value::as_str)
                .ok_or("send_message is missing `channel`")?
                .to_string();
            let message = field(body, "message")
                .and_then(Value::as_str)
                .map(str::to_string);
            let expr = parse_optional_expr(body, "message_expression")?;
            Ok(Action::SendMessage {
                channel,
                message,
                expr,
                emit,
            })
        }
        "buffer" => {
            let key = field(body, "key")
                .and_then(Value::as_str)
                .ok_or("buffer is missing `key`")?
                .to_string();
            let expr = parse_optional_expr(body, "value_expression")?;
            let max_samples = match field(body, "max_samples") {
                Some(v) => Some(
                    v.as_u64()
                        .map(|n| n as usize)
                        .ok_or("`max_samples` must be a non-negative integer")?,
                ),
                None => None,
            };
            Ok(Action::Buffer {
                key,
                expr,
                max_samples,
                emit,
            })
        }
        "log" => {
            let message = field(body, "message")
                .and_then(Value::as_str)
                .ok_or("log is missing `message`")?
                .to_string();
            let level = match field(body, "level").and_then(Value::as_str) {
                None | Some("info") => LogLevel::Info,
                Some("debug") => LogLevel::Debug,
                Some("warn") | Some("warning") => LogLevel::Warn,
                Some("error") => LogLevel::Error,
                Some(other) => return Err(format!("unknown log level `{other}`")),
            };
            Ok(Action::Log {
                level,
                message,
                emit,
            })
        }
        _ => unreachable!(),
    }
}

fn parse_emit_mode(map: &serde_yaml::Mapping) -> Result<EmitMode, String> {
    match field(map, "emit").and_then(Value::as_str) {
        None | Some("always") => Ok(EmitMode::Always),
        Some("on_change") => Ok(EmitMode::OnChange),
        Some("on_enter") => Ok(EmitMode::OnEnter),
        Some(other) => Err(format!("unknown emit mode `{other}`")),
    }
}

fn parse_optional_expr(
    body: &serde_yaml::Mapping,
    key: &str,
) -> Result<Option<SourcedExpr>, String> {
    match field(body, key).and_then(Value::as_str) {
        Some(source) => {
            let expr = parse_expression(source)?;
            Ok(Some(SourcedExpr {
                source: source.to_string(),
                expr,
            }))
        }
        None => Ok(None),
    }
}
