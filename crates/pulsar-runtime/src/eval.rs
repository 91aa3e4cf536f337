//! Condition-tree and expression evaluation.
//!
//! All sensor resolution, numeric coercion, and Kleene propagation happen
//! here, so emitted evaluation units never hand-roll them. A read that
//! cannot be resolved evaluates to `None`, which surfaces as
//! `Truth::Indeterminate` at the condition level.

use pulsar_core::{Value, compare_values};
use pulsar_lang::ast::*;

use crate::store::{CycleOutputs, LastKnownCache, OutputRead, SensorSnapshot};
use crate::temporal::TemporalStore;
use crate::truth::Truth;

// ---------------------------------------------------------------------------
// Sensor resolution
// ---------------------------------------------------------------------------

/// Read-side view of the cycle state for one rule's evaluation.
pub struct SensorResolver<'a> {
    pub inputs: &'a SensorSnapshot,
    pub outputs: &'a CycleOutputs,
    pub last_known: &'a LastKnownCache,
    pub bindings: &'a [InputBinding],
    pub now_ms: i64,
}

impl SensorResolver<'_> {
    /// Resolve a sensor to a value. Same-cycle outputs shadow the input
    /// snapshot; an explicit null write and an absent key both fall back
    /// to the rule's declared policy for that sensor.
    pub fn resolve(&self, sensor: &str) -> Option<Value> {
        match self.outputs.read(sensor) {
            OutputRead::Value(value) => return Some(value.clone()),
            OutputRead::Null => return self.fallback(sensor),
            OutputRead::Absent => {}
        }
        if let Some(value) = self.inputs.get(sensor) {
            return Some(value.clone());
        }
        self.fallback(sensor)
    }

    fn fallback(&self, sensor: &str) -> Option<Value> {
        let binding = self.bindings.iter().find(|b| b.sensor == sensor)?;
        match &binding.fallback {
            FallbackPolicy::UseDefault(literal) => Some(Value::from_literal(literal)),
            FallbackPolicy::UseLastKnown { max_age_ms } => self
                .last_known
                .fresh(sensor, *max_age_ms, self.now_ms)
                .cloned(),
            FallbackPolicy::PropagateUnavailable | FallbackPolicy::SkipRule => None,
            _ => unreachable!("non_exhaustive FallbackPolicy variant"),
        }
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Evaluate a condition tree to three-valued truth.
pub fn eval_condition(
    tree: &ConditionTree,
    resolver: &SensorResolver<'_>,
    temporal: &mut TemporalStore,
) -> Truth {
    match tree {
        ConditionTree::Group { all, any } => {
            let mut result = None;
            if !all.is_empty() {
                let folded = all
                    .iter()
                    .map(|child| eval_condition(child, resolver, temporal))
                    .fold(Truth::True, Truth::and);
                result = Some(folded);
            }
            if !any.is_empty() {
                let folded = any
                    .iter()
                    .map(|child| eval_condition(child, resolver, temporal))
                    .fold(Truth::False, Truth::or);
                result = Some(match result {
                    Some(all_t) => all_t.and(folded),
                    None => folded,
                });
            }
            result.unwrap_or(Truth::True)
        }
        ConditionTree::Comparison { sensor, op, value } => match resolver.resolve(sensor) {
            Some(actual) => compare_values(*op, &actual, &Value::from_literal(value))
                .map(Truth::from_bool)
                .unwrap_or(Truth::Indeterminate),
            None => Truth::Indeterminate,
        },
        ConditionTree::Expression { expr, .. } => eval_expr_truth(expr, resolver),
        ConditionTree::TemporalThreshold {
            sensor,
            op,
            threshold,
            duration_ms,
            mode,
        } => {
            let sample = resolver.resolve(sensor).and_then(|v| v.as_f64());
            temporal.evaluate(
                sensor,
                *op,
                *threshold,
                *duration_ms,
                *mode,
                sample,
                resolver.now_ms,
            )
        }
        _ => unreachable!("non_exhaustive ConditionTree variant"),
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Boolean view of an expression with Kleene propagation through the
/// logical operators. A non-boolean or unavailable result is Indeterminate.
pub fn eval_expr_truth(expr: &Expr, resolver: &SensorResolver<'_>) -> Truth {
    match expr {
        Expr::BinOp {
            op: BinOp::And,
            left,
            right,
        } => eval_expr_truth(left, resolver).and(eval_expr_truth(right, resolver)),
        Expr::BinOp {
            op: BinOp::Or,
            left,
            right,
        } => eval_expr_truth(left, resolver).or(eval_expr_truth(right, resolver)),
        Expr::Not(inner) => eval_expr_truth(inner, resolver).not(),
        _ => match eval_expr_value(expr, resolver) {
            Some(Value::Bool(b)) => Truth::from_bool(b),
            _ => Truth::Indeterminate,
        },
    }
}

/// Value view of an expression. `None` means unavailable: a missing
/// sensor, a failed coercion, division by zero, or a non-finite result.
pub fn eval_expr_value(expr: &Expr, resolver: &SensorResolver<'_>) -> Option<Value> {
    match expr {
        Expr::Number(n) => Some(Value::Number(*n)),
        Expr::StringLit(s) => Some(Value::Str(s.clone())),
        Expr::Bool(b) => Some(Value::Bool(*b)),
        Expr::Null => None,
        Expr::Sensor(id) => resolver.resolve(id),
        Expr::Neg(inner) => {
            let n = eval_expr_value(inner, resolver)?.as_f64()?;
            Some(Value::Number(-n))
        }
        Expr::Not(_)
        | Expr::BinOp {
            op: BinOp::And | BinOp::Or,
            ..
        } => match eval_expr_truth(expr, resolver) {
            Truth::True => Some(Value::Bool(true)),
            Truth::False => Some(Value::Bool(false)),
            Truth::Indeterminate => None,
        },
        Expr::BinOp { op, left, right } => {
            let lv = eval_expr_value(left, resolver)?;
            let rv = eval_expr_value(right, resolver)?;
            match op {
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                    compare_values(cmp_of(*op), &lv, &rv).map(Value::Bool)
                }
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                    let a = lv.as_f64()?;
                    let b = rv.as_f64()?;
                    let out = match op {
                        BinOp::Add => a + b,
                        BinOp::Sub => a - b,
                        BinOp::Mul => a * b,
                        BinOp::Div => {
                            if b == 0.0 {
                                return None;
                            }
                            a / b
                        }
                        _ => unreachable!(),
                    };
                    finite(out)
                }
                BinOp::And | BinOp::Or => unreachable!(),
                _ => unreachable!("non_exhaustive BinOp variant"),
            }
        }
        Expr::Func { func, args } => {
            let mut nums = Vec::with_capacity(args.len());
            for arg in args {
                nums.push(eval_expr_value(arg, resolver)?.as_f64()?);
            }
            apply_math(*func, &nums)
        }
        _ => unreachable!("non_exhaustive Expr variant"),
    }
}

fn cmp_of(op: BinOp) -> CmpOp {
    match op {
        BinOp::Eq => CmpOp::Eq,
        BinOp::Ne => CmpOp::Ne,
        BinOp::Lt => CmpOp::Lt,
        BinOp::Gt => CmpOp::Gt,
        BinOp::Le => CmpOp::Le,
        BinOp::Ge => CmpOp::Ge,
        _ => unreachable!("not a comparison operator"),
    }
}

fn apply_math(func: MathFn, args: &[f64]) -> Option<Value> {
    let out = match (func, args) {
        (MathFn::Sin, [x]) => x.sin(),
        (MathFn::Cos, [x]) => x.cos(),
        (MathFn::Tan, [x]) => x.tan(),
        (MathFn::Log, [x]) if *x > 0.0 => x.ln(),
        (MathFn::Exp, [x]) => x.exp(),
        (MathFn::Sqrt, [x]) if *x >= 0.0 => x.sqrt(),
        (MathFn::Abs, [x]) => x.abs(),
        (MathFn::Max, [a, b]) => a.max(*b),
        (MathFn::Min, [a, b]) => a.min(*b),
        _ => return None,
    };
    finite(out)
}

fn finite(n: f64) -> Option<Value> {
    n.is_finite().then_some(Value::Number(n))
}
