//! Rule-level evaluation: the compiled rule shape emitted units construct,
//! the process-wide cycle state, and the three-valued dispatch into
//! primary or else actions.

use chrono::{DateTime, SecondsFormat, Utc};

use pulsar_core::Value;
use pulsar_lang::ast::*;

use crate::emit::EmitGates;
use crate::eval::{SensorResolver, eval_condition, eval_expr_value};
use crate::store::{CycleOutputs, LastKnownCache, SensorSnapshot};
use crate::temporal::{DEFAULT_BUFFER_CAPACITY, TemporalStore};
use crate::truth::Truth;

// ---------------------------------------------------------------------------
// Compiled rules
// ---------------------------------------------------------------------------

/// One rule as constructed by an emitted evaluation unit.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub condition: ConditionTree,
    pub actions: Vec<Action>,
    pub else_actions: Vec<Action>,
    pub bindings: Vec<InputBinding>,
    /// What the `$input` action literal resolves to.
    pub canonical_input: Option<String>,
}

/// What one rule evaluation did this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Fired,
    ElseFired,
    /// Condition was False and the rule has no else branch.
    Idle,
    /// Condition was Indeterminate; neither branch ran.
    Indeterminate,
    /// A `skip_rule` fallback tripped on an unavailable sensor.
    Skipped,
}

// ---------------------------------------------------------------------------
// Cycle state
// ---------------------------------------------------------------------------

/// A side effect produced by an action, queued for the I/O adapters.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Set { key: String, value: Option<Value> },
    Message { channel: String, payload: String },
    Buffered { key: String, value: Value },
}

/// Process-wide evaluation state. Initialized once at runtime start;
/// `begin_cycle` installs a fresh input snapshot while trackers, gates,
/// outputs, and caches persist across cycles.
#[derive(Debug, Clone)]
pub struct CycleState {
    pub inputs: SensorSnapshot,
    pub outputs: CycleOutputs,
    pub last_known: LastKnownCache,
    pub temporal: TemporalStore,
    pub buffers: SampleBuffers,
    pub gates: EmitGates,
    pub outbox: Vec<Emission>,
    pub now_ms: i64,
}

impl Default for CycleState {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl CycleState {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            inputs: SensorSnapshot::new(),
            outputs: CycleOutputs::new(),
            last_known: LastKnownCache::new(),
            temporal: TemporalStore::new(buffer_capacity),
            buffers: SampleBuffers::new(buffer_capacity),
            gates: EmitGates::new(),
            outbox: Vec::new(),
            now_ms: 0,
        }
    }

    /// Install the snapshot captured at cycle start. Every snapshot value
    /// also refreshes the last-known cache.
    pub fn begin_cycle(&mut self, inputs: SensorSnapshot, now_ms: i64) {
        for (sensor, value) in inputs.iter() {
            self.last_known.record(sensor.clone(), value.clone(), now_ms);
        }
        self.inputs = inputs;
        self.now_ms = now_ms;
        self.outbox.clear();
    }

    /// Drain the side effects queued during this cycle.
    pub fn take_emissions(&mut self) -> Vec<Emission> {
        std::mem::take(&mut self.outbox)
    }
}

/// Windowed value histories fed by `buffer` actions.
#[derive(Debug, Clone)]
pub struct SampleBuffers {
    buffers: std::collections::BTreeMap<String, std::collections::VecDeque<(Value, i64)>>,
    default_capacity: usize,
}

impl SampleBuffers {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: std::collections::BTreeMap::new(),
            default_capacity,
        }
    }

    pub fn append(&mut self, key: &str, value: Value, at_ms: i64, cap: Option<usize>) {
        let cap = cap.unwrap_or(self.default_capacity);
        let buffer = self.buffers.entry(key.to_string()).or_default();
        buffer.push_back((value, at_ms));
        while buffer.len() > cap {
            buffer.pop_front();
        }
    }

    pub fn len_of(&self, key: &str) -> usize {
        self.buffers.get(key).map(|b| b.len()).unwrap_or(0)
    }

    pub fn latest(&self, key: &str) -> Option<&(Value, i64)> {
        self.buffers.get(key).and_then(|b| b.back())
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate one rule against the current cycle state: decide the condition
/// in three-valued logic, then run the primary actions on True, the else
/// actions on False, and nothing on Indeterminate. Never panics on missing
/// sensors.
pub fn evaluate_rule(rule: &CompiledRule, state: &mut CycleState) -> RuleOutcome {
    if skip_requested(rule, state) {
        tracing::debug!(rule = %rule.name, "skipped: required sensor unavailable");
        return RuleOutcome::Skipped;
    }

    let truth = {
        let resolver = SensorResolver {
            inputs: &state.inputs,
            outputs: &state.outputs,
            last_known: &state.last_known,
            bindings: &rule.bindings,
            now_ms: state.now_ms,
        };
        eval_condition(&rule.condition, &resolver, &mut state.temporal)
    };

    match truth {
        Truth::True => {
            run_actions(rule, &rule.actions, true, state);
            RuleOutcome::Fired
        }
        Truth::False => {
            // The enter-latch must see the False cycle or the next True
            // would not register as an edge.
            note_enter_edges(&rule.actions, false, state);
            if rule.else_actions.is_empty() {
                RuleOutcome::Idle
            } else {
                run_actions(rule, &rule.else_actions, false, state);
                RuleOutcome::ElseFired
            }
        }
        Truth::Indeterminate => {
            note_enter_edges(&rule.actions, false, state);
            RuleOutcome::Indeterminate
        }
    }
}

/// A `skip_rule` fallback skips the whole rule when its sensor has no
/// value in the snapshot or the same-cycle outputs.
fn skip_requested(rule: &CompiledRule, state: &CycleState) -> bool {
    rule.bindings
        .iter()
        .filter(|b| matches!(b.fallback, FallbackPolicy::SkipRule))
        .any(|b| {
            matches!(state.outputs.read(&b.sensor), crate::store::OutputRead::Absent)
                && state.inputs.get(&b.sensor).is_none()
        })
}

fn note_enter_edges(actions: &[Action], active: bool, state: &mut CycleState) {
    for action in actions {
        if action.emit_mode() == EmitMode::OnEnter {
            if let Some(key) = action.state_key() {
                state.gates.on_enter(key, active);
            }
        }
    }
}

fn run_actions(rule: &CompiledRule, actions: &[Action], condition_active: bool, state: &mut CycleState) {
    for action in actions {
        run_action(rule, action, condition_active, state);
    }
}

fn run_action(rule: &CompiledRule, action: &Action, condition_active: bool, state: &mut CycleState) {
    match action {
        Action::Set {
            key,
            value,
            expr,
            emit,
        } => {
            let computed = set_value_of(rule, value.as_ref(), expr.as_ref(), state);
            if !gate_allows(*emit, key, &computed, condition_active, state) {
                return;
            }
            state.outputs.write(key.clone(), computed.clone());
            state.outbox.push(Emission::Set {
                key: key.clone(),
                value: computed,
            });
        }
        Action::SendMessage {
            channel,
            message,
            expr,
            emit,
        } => {
            let payload = match (message, expr) {
                (Some(text), _) => Some(Value::Str(text.clone())),
                (None, Some(sourced)) => eval_action_expr(rule, &sourced.expr, state),
                (None, None) => None,
            };
            let Some(payload) = payload else {
                tracing::debug!(rule = %rule.name, channel = %channel, "message unavailable, not sent");
                return;
            };
            if !gate_allows(*emit, channel, &Some(payload.clone()), condition_active, state) {
                return;
            }
            state.outbox.push(Emission::Message {
                channel: channel.clone(),
                payload: payload.to_string(),
            });
        }
        Action::Buffer {
            key,
            expr,
            max_samples,
            emit,
        } => {
            let value = match expr {
                Some(sourced) => eval_action_expr(rule, &sourced.expr, state),
                None => canonical_input_value(rule, state),
            };
            let Some(value) = value else {
                return;
            };
            let gated = Some(value.clone());
            if !gate_allows(*emit, key, &gated, condition_active, state) {
                return;
            }
            state
                .buffers
                .append(key, value.clone(), state.now_ms, *max_samples);
            state.outbox.push(Emission::Buffered {
                key: key.clone(),
                value,
            });
        }
        Action::Log { level, message, .. } => match level {
            LogLevel::Debug => tracing::debug!(rule = %rule.name, "{message}"),
            LogLevel::Info => tracing::info!(rule = %rule.name, "{message}"),
            LogLevel::Warn => tracing::warn!(rule = %rule.name, "{message}"),
            LogLevel::Error => tracing::error!(rule = %rule.name, "{message}"),
        },
        _ => unreachable!("non_exhaustive Action variant"),
    }
}

/// Emit-mode gating for one action's key.
fn gate_allows(
    emit: EmitMode,
    key: &str,
    value: &Option<Value>,
    condition_active: bool,
    state: &mut CycleState,
) -> bool {
    match emit {
        EmitMode::Always => true,
        EmitMode::OnChange => state.gates.on_change(key, value),
        EmitMode::OnEnter => state.gates.on_enter(key, condition_active),
    }
}

/// The value a `set_value` writes: the literal (with `now()` and `$input`
/// translated) or the evaluated expression. `None` is a null write.
fn set_value_of(
    rule: &CompiledRule,
    value: Option<&Literal>,
    expr: Option<&SourcedExpr>,
    state: &CycleState,
) -> Option<Value> {
    if let Some(literal) = value {
        return match literal {
            Literal::Str(s) if s == "now()" => Some(Value::Str(iso_timestamp(state.now_ms))),
            Literal::Str(s) if s == "$input" => canonical_input_value(rule, state),
            other => Some(Value::from_literal(other)),
        };
    }
    let sourced = expr?;
    eval_action_expr(rule, &sourced.expr, state)
}

fn eval_action_expr(rule: &CompiledRule, expr: &Expr, state: &CycleState) -> Option<Value> {
    let resolver = SensorResolver {
        inputs: &state.inputs,
        outputs: &state.outputs,
        last_known: &state.last_known,
        bindings: &rule.bindings,
        now_ms: state.now_ms,
    };
    eval_expr_value(expr, &resolver)
}

fn canonical_input_value(rule: &CompiledRule, state: &CycleState) -> Option<Value> {
    let sensor = rule.canonical_input.as_deref()?;
    let resolver = SensorResolver {
        inputs: &state.inputs,
        outputs: &state.outputs,
        last_known: &state.last_known,
        bindings: &rule.bindings,
        now_ms: state.now_ms,
    };
    resolver.resolve(sensor)
}

fn iso_timestamp(now_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(now_ms) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => "1970-01-01T00:00:00.000Z".to_string(),
    }
}
