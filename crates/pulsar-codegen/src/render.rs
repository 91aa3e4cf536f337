//! Rendering of rule AST values as Rust constructor source.
//!
//! Emitted units rebuild each rule's condition tree with these
//! constructors and hand evaluation to `pulsar_runtime` — identifiers are
//! never spliced into host code, so missing-sensor handling and Kleene
//! semantics stay centralized in the runtime.

use pulsar_lang::ast::*;

// ---------------------------------------------------------------------------
// Source buffer
// ---------------------------------------------------------------------------

const INDENT: &str = "    ";

/// Line-oriented output buffer with indentation tracking.
pub struct SourceBuffer {
    out: String,
    indent: usize,
}

impl Default for SourceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceBuffer {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emit a line and indent the following lines.
    pub fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    /// Dedent and emit the closing line.
    pub fn close(&mut self, text: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Inline renderers
// ---------------------------------------------------------------------------

pub fn render_literal(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) => format!("Literal::Number({n}f64)"),
        Literal::Bool(b) => format!("Literal::Bool({b})"),
        Literal::Str(s) => format!("Literal::Str({s:?}.to_string())"),
        _ => unreachable!("non_exhaustive Literal variant"),
    }
}

pub fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Number(n) => format!("Expr::Number({n}f64)"),
        Expr::StringLit(s) => format!("Expr::StringLit({s:?}.to_string())"),
        Expr::Bool(b) => format!("Expr::Bool({b})"),
        Expr::Null => "Expr::Null".to_string(),
        Expr::Sensor(id) => format!("Expr::Sensor({id:?}.to_string())"),
        Expr::Neg(inner) => format!("Expr::Neg(Box::new({}))", render_expr(inner)),
        Expr::Not(inner) => format!("Expr::Not(Box::new({}))", render_expr(inner)),
        Expr::BinOp { op, left, right } => format!(
            "Expr::BinOp {{ op: BinOp::{op:?}, left: Box::new({}), right: Box::new({}) }}",
            render_expr(left),
            render_expr(right)
        ),
        Expr::Func { func, args } => {
            let args: Vec<String> = args.iter().map(render_expr).collect();
            format!(
                "Expr::Func {{ func: MathFn::{func:?}, args: vec![{}] }}",
                args.join(", ")
            )
        }
        _ => unreachable!("non_exhaustive Expr variant"),
    }
}

fn render_sourced_expr(sourced: &SourcedExpr) -> String {
    format!(
        "SourcedExpr {{ source: {:?}.to_string(), expr: {} }}",
        sourced.source,
        render_expr(&sourced.expr)
    )
}

fn render_option<T>(value: Option<&T>, render: impl Fn(&T) -> String) -> String {
    match value {
        Some(inner) => format!("Some({})", render(inner)),
        None => "None".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Block renderers
// ---------------------------------------------------------------------------

pub fn render_condition(buf: &mut SourceBuffer, tree: &ConditionTree) {
    match tree {
        ConditionTree::Group { all, any } => {
            buf.open("ConditionTree::Group {");
            render_condition_list(buf, "all", all);
            render_condition_list(buf, "any", any);
            buf.close("}");
        }
        ConditionTree::Comparison { sensor, op, value } => {
            buf.open("ConditionTree::Comparison {");
            buf.line(&format!("sensor: {sensor:?}.to_string(),"));
            buf.line(&format!("op: CmpOp::{op:?},"));
            buf.line(&format!("value: {},", render_literal(value)));
            buf.close("}");
        }
        ConditionTree::Expression { source, expr } => {
            buf.open("ConditionTree::Expression {");
            buf.line(&format!("source: {source:?}.to_string(),"));
            buf.line(&format!("expr: {},", render_expr(expr)));
            buf.close("}");
        }
        ConditionTree::TemporalThreshold {
            sensor,
            op,
            threshold,
            duration_ms,
            mode,
        } => {
            buf.open("ConditionTree::TemporalThreshold {");
            buf.line(&format!("sensor: {sensor:?}.to_string(),"));
            buf.line(&format!("op: CmpOp::{op:?},"));
            buf.line(&format!("threshold: {threshold}f64,"));
            buf.line(&format!("duration_ms: {duration_ms},"));
            buf.line(&format!("mode: TemporalMode::{mode:?},"));
            buf.close("}");
        }
        _ => unreachable!("non_exhaustive ConditionTree variant"),
    }
}

fn render_condition_list(buf: &mut SourceBuffer, field: &str, children: &[ConditionTree]) {
    if children.is_empty() {
        buf.line(&format!("{field}: vec![],"));
        return;
    }
    buf.open(&format!("{field}: vec!["));
    for child in children {
        render_condition_item(buf, child);
    }
    buf.close("],");
}

/// Same as `render_condition` but with a trailing comma, for vec elements.
fn render_condition_item(buf: &mut SourceBuffer, tree: &ConditionTree) {
    let mut inner = SourceBuffer::new();
    render_condition(&mut inner, tree);
    let rendered = inner.finish();
    let mut lines = rendered.lines().peekable();
    while let Some(line) = lines.next() {
        if lines.peek().is_none() {
            buf.line(&format!("{line},"));
        } else {
            buf.line(line);
        }
    }
}

pub fn render_action(buf: &mut SourceBuffer, action: &Action) {
    match action {
        Action::Set {
            key,
            value,
            expr,
            emit,
        } => {
            buf.open("Action::Set {");
            buf.line(&format!("key: {key:?}.to_string(),"));
            buf.line(&format!(
                "value: {},",
                render_option(value.as_ref(), render_literal)
            ));
            buf.line(&format!(
                "expr: {},",
                render_option(expr.as_ref(), render_sourced_expr)
            ));
            buf.line(&format!("emit: EmitMode::{emit:?},"));
            buf.close("},");
        }
        Action::SendMessage {
            channel,
            message,
            expr,
            emit,
        } => {
            buf.open("Action::SendMessage {");
            buf.line(&format!("channel: {channel:?}.to_string(),"));
            buf.line(&format!(
                "message: {},",
                render_option(message.as_ref(), |m| format!("{m:?}.to_string()"))
            ));
            buf.line(&format!(
                "expr: {},",
                render_option(expr.as_ref(), render_sourced_expr)
            ));
            buf.line(&format!("emit: EmitMode::{emit:?},"));
            buf.close("},");
        }
        Action::Buffer {
            key,
            expr,
            max_samples,
            emit,
        } => {
            buf.open("Action::Buffer {");
            buf.line(&format!("key: {key:?}.to_string(),"));
            buf.line(&format!(
                "expr: {},",
                render_option(expr.as_ref(), render_sourced_expr)
            ));
            buf.line(&format!(
                "max_samples: {},",
                render_option(max_samples.as_ref(), |n| format!("{n}usize"))
            ));
            buf.line(&format!("emit: EmitMode::{emit:?},"));
            buf.close("},");
        }
        Action::Log {
            level,
            message,
            emit,
        } => {
            buf.open("Action::Log {");
            buf.line(&format!("level: LogLevel::{level:?},"));
            buf.line(&format!("message: {message:?}.to_string(),"));
            buf.line(&format!("emit: EmitMode::{emit:?},"));
            buf.close("},");
        }
        _ => unreachable!("non_exhaustive Action variant"),
    }
}

pub fn render_binding(buf: &mut SourceBuffer, binding: &InputBinding) {
    buf.open("InputBinding {");
    buf.line(&format!("sensor: {:?}.to_string(),", binding.sensor));
    buf.line(&format!("required: {},", binding.required));
    let fallback = match &binding.fallback {
        FallbackPolicy::UseDefault(lit) => {
            format!("FallbackPolicy::UseDefault({})", render_literal(lit))
        }
        FallbackPolicy::UseLastKnown { max_age_ms } => format!(
            "FallbackPolicy::UseLastKnown {{ max_age_ms: {} }}",
            render_option(max_age_ms.as_ref(), |n| format!("{n}u64"))
        ),
        FallbackPolicy::PropagateUnavailable => "FallbackPolicy::PropagateUnavailable".to_string(),
        FallbackPolicy::SkipRule => "FallbackPolicy::SkipRule".to_string(),
        _ => unreachable!("non_exhaustive FallbackPolicy variant"),
    };
    buf.line(&format!("fallback: {fallback},"));
    buf.close("},");
}
