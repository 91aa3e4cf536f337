use super::{CmpOp, Expr};

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// A literal comparison/action value as written in the rule document.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Literal {
    Number(f64),
    Bool(bool),
    Str(String),
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Window semantics for a temporal threshold.
///
/// Strict considers only samples inside the window. Extended additionally
/// keeps the latest sample before the window as a guard value, so a sensor
/// that held the threshold but stopped reporting does not flip to False.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalMode {
    Strict,
    Extended,
}

/// A rule's condition tree.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConditionTree {
    /// `all:` children are and-reduced, `any:` children are or-reduced;
    /// a group with both reduces to `all(...) and any(...)`.
    Group {
        all: Vec<ConditionTree>,
        any: Vec<ConditionTree>,
    },
    /// Single sensor against a literal.
    Comparison {
        sensor: String,
        op: CmpOp,
        value: Literal,
    },
    /// Parsed expression plus the original source text (kept for
    /// diagnostics and metadata emission).
    Expression { source: String, expr: Expr },
    /// Threshold sustained over a window of `duration_ms`.
    TemporalThreshold {
        sensor: String,
        op: CmpOp,
        threshold: f64,
        duration_ms: u64,
        mode: TemporalMode,
    },
}

impl ConditionTree {
    /// Number of leaf conditions (comparisons, expressions, thresholds).
    pub fn leaf_count(&self) -> usize {
        match self {
            ConditionTree::Group { all, any } => all
                .iter()
                .chain(any.iter())
                .map(ConditionTree::leaf_count)
                .sum(),
            _ => 1,
        }
    }

    /// Maximum group nesting depth; leaves have depth 1.
    pub fn depth(&self) -> usize {
        match self {
            ConditionTree::Group { all, any } => {
                1 + all
                    .iter()
                    .chain(any.iter())
                    .map(ConditionTree::depth)
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        }
    }

    /// True iff any leaf is a temporal threshold.
    pub fn is_temporal(&self) -> bool {
        match self {
            ConditionTree::Group { all, any } => {
                all.iter().chain(any.iter()).any(ConditionTree::is_temporal)
            }
            ConditionTree::TemporalThreshold { .. } => true,
            _ => false,
        }
    }
}
