use pulsar_lang::ast::{CmpOp, Literal};
use serde::{Deserialize, Serialize};

/// A scalar sensor value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Value {
    pub fn from_literal(lit: &Literal) -> Value {
        match lit {
            Literal::Number(n) => Value::Number(*n),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Str(s) => Value::Str(s.clone()),
            _ => unreachable!("non_exhaustive Literal variant"),
        }
    }

    /// Numeric coercion: numbers pass through, bools map to 1/0, strings
    /// parse when they hold a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Structural equality for `==`/`!=`: same-type comparison first, numeric
/// coercion as the cross-type fallback.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Apply a comparison operator. Ordering operators coerce numerically;
/// equality is structural. `None` when coercion fails.
pub fn compare_values(op: CmpOp, left: &Value, right: &Value) -> Option<bool> {
    match op {
        CmpOp::Eq => Some(values_equal(left, right)),
        CmpOp::Ne => Some(!values_equal(left, right)),
        CmpOp::Lt | CmpOp::Gt | CmpOp::Le | CmpOp::Ge => {
            // Ordering coerces numerically; two non-numeric strings fall
            // back to lexicographic order.
            if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
                return Some(match op {
                    CmpOp::Lt => a < b,
                    CmpOp::Gt => a > b,
                    CmpOp::Le => a <= b,
                    CmpOp::Ge => a >= b,
                    _ => unreachable!(),
                });
            }
            if let (Value::Str(a), Value::Str(b)) = (left, right) {
                return Some(match op {
                    CmpOp::Lt => a < b,
                    CmpOp::Gt => a > b,
                    CmpOp::Le => a <= b,
                    CmpOp::Ge => a >= b,
                    _ => unreachable!(),
                });
            }
            None
        }
        _ => unreachable!("non_exhaustive CmpOp variant"),
    }
}
