use super::{Expr, Literal};

// ---------------------------------------------------------------------------
// Emit modes
// ---------------------------------------------------------------------------

/// When an action's output is actually emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitMode {
    /// Unconditional, every cycle the rule fires.
    #[default]
    Always,
    /// Only when the emitted value differs from the last emitted value.
    OnChange,
    /// Only on the False/Indeterminate-to-True edge of the rule condition.
    OnEnter,
}

/// Severity of a `log` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// An expression together with its original source text.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedExpr {
    pub source: String,
    pub expr: Expr,
}

/// A rule action. `Set` writes a key-value output, `SendMessage` publishes
/// on a channel, `Buffer` appends to a windowed history, `Log` records a
/// diagnostic.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Action {
    Set {
        key: String,
        value: Option<Literal>,
        expr: Option<SourcedExpr>,
        emit: EmitMode,
    },
    SendMessage {
        channel: String,
        message: Option<String>,
        expr: Option<SourcedExpr>,
        emit: EmitMode,
    },
    Buffer {
        key: String,
        expr: Option<SourcedExpr>,
        max_samples: Option<usize>,
        emit: EmitMode,
    },
    Log {
        level: LogLevel,
        message: String,
        emit: EmitMode,
    },
}

impl Action {
    /// The output key this action writes, if it writes one (`Set` only —
    /// buffers are histories, not single-writer outputs).
    pub fn set_key(&self) -> Option<&str> {
        match self {
            Action::Set { key, .. } => Some(key),
            _ => None,
        }
    }

    /// The key under which emit-mode state is tracked for this action.
    pub fn state_key(&self) -> Option<&str> {
        match self {
            Action::Set { key, .. } | Action::Buffer { key, .. } => Some(key),
            Action::SendMessage { channel, .. } => Some(channel),
            Action::Log { .. } => None,
        }
    }

    pub fn emit_mode(&self) -> EmitMode {
        match self {
            Action::Set { emit, .. }
            | Action::SendMessage { emit, .. }
            | Action::Buffer { emit, .. }
            | Action::Log { emit, .. } => *emit,
        }
    }

    /// The expression carried by this action, if any.
    pub fn expression(&self) -> Option<&SourcedExpr> {
        match self {
            Action::Set { expr, .. }
            | Action::SendMessage { expr, .. }
            | Action::Buffer { expr, .. } => expr.as_ref(),
            Action::Log { .. } => None,
        }
    }
}
