//! Rule-level evaluation behavior: three-valued dispatch, fallback
//! policies, emit modes, and action literals.

use pulsar_core::Value;
use pulsar_lang::ast::*;
use pulsar_runtime::{CompiledRule, CycleState, Emission, RuleOutcome, SensorSnapshot, evaluate_rule};

fn comparison(sensor: &str, op: CmpOp, value: f64) -> ConditionTree {
    ConditionTree::Comparison {
        sensor: sensor.to_string(),
        op,
        value: Literal::Number(value),
    }
}

fn set_action(key: &str, value: Literal) -> Action {
    Action::Set {
        key: key.to_string(),
        value: Some(value),
        expr: None,
        emit: EmitMode::Always,
    }
}

fn rule_with(condition: ConditionTree, actions: Vec<Action>) -> CompiledRule {
    CompiledRule {
        name: "test_rule".to_string(),
        condition,
        actions,
        else_actions: Vec::new(),
        bindings: Vec::new(),
        canonical_input: None,
    }
}

fn snapshot(entries: &[(&str, Value)]) -> SensorSnapshot {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Three-valued dispatch (scenario: any-group with one missing operand)
// ---------------------------------------------------------------------------

#[test]
fn any_group_is_true_when_one_branch_decides() {
    let rule = rule_with(
        ConditionTree::Group {
            all: vec![],
            any: vec![
                comparison("input:a", CmpOp::Gt, 1.0),
                comparison("input:b", CmpOp::Gt, 1.0),
            ],
        },
        vec![set_action("output:alert", Literal::Bool(true))],
    );
    let mut state = CycleState::default();
    state.begin_cycle(snapshot(&[("input:a", Value::Number(2.0))]), 1_000);

    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::Fired);
    assert_eq!(
        state.take_emissions(),
        vec![Emission::Set {
            key: "output:alert".to_string(),
            value: Some(Value::Bool(true)),
        }]
    );
}

#[test]
fn any_group_is_indeterminate_when_all_operands_are_missing() {
    let rule = CompiledRule {
        else_actions: vec![set_action("output:calm", Literal::Bool(true))],
        ..rule_with(
            ConditionTree::Group {
                all: vec![],
                any: vec![
                    comparison("input:a", CmpOp::Gt, 1.0),
                    comparison("input:b", CmpOp::Gt, 1.0),
                ],
            },
            vec![set_action("output:alert", Literal::Bool(true))],
        )
    };
    let mut state = CycleState::default();
    state.begin_cycle(SensorSnapshot::new(), 1_000);

    // Neither the primary nor the else branch fires.
    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::Indeterminate);
    assert!(state.take_emissions().is_empty());
}

#[test]
fn false_condition_runs_the_else_branch() {
    let rule = CompiledRule {
        else_actions: vec![set_action("output:calm", Literal::Bool(true))],
        ..rule_with(
            comparison("input:a", CmpOp::Gt, 10.0),
            vec![set_action("output:alert", Literal::Bool(true))],
        )
    };
    let mut state = CycleState::default();
    state.begin_cycle(snapshot(&[("input:a", Value::Number(1.0))]), 1_000);

    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::ElseFired);
    assert_eq!(
        state.take_emissions(),
        vec![Emission::Set {
            key: "output:calm".to_string(),
            value: Some(Value::Bool(true)),
        }]
    );
}

// ---------------------------------------------------------------------------
// Same-cycle output visibility
// ---------------------------------------------------------------------------

#[test]
fn outputs_of_earlier_rules_are_visible_in_the_same_cycle() {
    let producer = rule_with(
        comparison("input:temperature", CmpOp::Gt, 20.0),
        vec![Action::Set {
            key: "output:norm".to_string(),
            value: None,
            expr: Some(SourcedExpr {
                source: "input:temperature / 100".to_string(),
                expr: Expr::BinOp {
                    op: BinOp::Div,
                    left: Box::new(Expr::Sensor("input:temperature".to_string())),
                    right: Box::new(Expr::Number(100.0)),
                },
            }),
            emit: EmitMode::Always,
        }],
    );
    let consumer = rule_with(
        comparison("output:norm", CmpOp::Gt, 0.25),
        vec![set_action("output:alert_level", Literal::Number(1.0))],
    );

    let mut state = CycleState::default();
    state.begin_cycle(snapshot(&[("input:temperature", Value::Number(30.0))]), 0);

    assert_eq!(evaluate_rule(&producer, &mut state), RuleOutcome::Fired);
    assert_eq!(evaluate_rule(&consumer, &mut state), RuleOutcome::Fired);
}

#[test]
fn missing_sensor_in_set_expression_writes_null() {
    let rule = rule_with(
        comparison("input:a", CmpOp::Gt, 0.0),
        vec![Action::Set {
            key: "output:derived".to_string(),
            value: None,
            expr: Some(SourcedExpr {
                source: "input:gone * 2".to_string(),
                expr: Expr::BinOp {
                    op: BinOp::Mul,
                    left: Box::new(Expr::Sensor("input:gone".to_string())),
                    right: Box::new(Expr::Number(2.0)),
                },
            }),
            emit: EmitMode::Always,
        }],
    );
    let mut state = CycleState::default();
    state.begin_cycle(snapshot(&[("input:a", Value::Number(1.0))]), 0);

    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::Fired);
    assert_eq!(
        state.take_emissions(),
        vec![Emission::Set {
            key: "output:derived".to_string(),
            value: None,
        }]
    );
}

// ---------------------------------------------------------------------------
// Fallback policies
// ---------------------------------------------------------------------------

#[test]
fn use_default_fallback_supplies_the_value() {
    let rule = CompiledRule {
        bindings: vec![InputBinding::new(
            "input:pressure".to_string(),
            true,
            FallbackPolicy::UseDefault(Literal::Number(1000.0)),
        )],
        ..rule_with(
            comparison("input:pressure", CmpOp::Gt, 900.0),
            vec![set_action("output:ok", Literal::Bool(true))],
        )
    };
    let mut state = CycleState::default();
    state.begin_cycle(SensorSnapshot::new(), 0);
    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::Fired);
}

#[test]
fn use_last_known_fallback_expires() {
    let rule = CompiledRule {
        bindings: vec![InputBinding::new(
            "input:t".to_string(),
            true,
            FallbackPolicy::UseLastKnown {
                max_age_ms: Some(5_000),
            },
        )],
        ..rule_with(
            comparison("input:t", CmpOp::Gt, 0.0),
            vec![set_action("output:warm", Literal::Bool(true))],
        )
    };
    let mut state = CycleState::default();

    // Cycle 1: sensor present, cache primed.
    state.begin_cycle(snapshot(&[("input:t", Value::Number(3.0))]), 0);
    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::Fired);

    // Cycle 2: sensor gone, cache still fresh.
    state.begin_cycle(SensorSnapshot::new(), 4_000);
    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::Fired);

    // Cycle 3: cache older than max_age.
    state.begin_cycle(SensorSnapshot::new(), 10_000);
    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::Indeterminate);
}

#[test]
fn skip_rule_fallback_skips_evaluation() {
    let rule = CompiledRule {
        bindings: vec![InputBinding::new(
            "input:t".to_string(),
            true,
            FallbackPolicy::SkipRule,
        )],
        ..rule_with(
            comparison("input:t", CmpOp::Gt, 0.0),
            vec![set_action("output:x", Literal::Bool(true))],
        )
    };
    let mut state = CycleState::default();
    state.begin_cycle(SensorSnapshot::new(), 0);
    assert_eq!(evaluate_rule(&rule, &mut state), RuleOutcome::Skipped);
    assert!(state.take_emissions().is_empty());
}

// ---------------------------------------------------------------------------
// Emit modes
// ---------------------------------------------------------------------------

#[test]
fn on_change_suppresses_repeated_values() {
    let rule = rule_with(
        comparison("input:a", CmpOp::Gt, 0.0),
        vec![Action::Set {
            key: "output:level".to_string(),
            value: Some(Literal::Number(1.0)),
            expr: None,
            emit: EmitMode::OnChange,
        }],
    );
    let mut state = CycleState::default();

    state.begin_cycle(snapshot(&[("input:a", Value::Number(1.0))]), 0);
    evaluate_rule(&rule, &mut state);
    assert_eq!(state.take_emissions().len(), 1);

    state.begin_cycle(snapshot(&[("input:a", Value::Number(1.0))]), 100);
    evaluate_rule(&rule, &mut state);
    assert!(state.take_emissions().is_empty());
}

#[test]
fn on_enter_fires_once_per_rising_edge() {
    let rule = rule_with(
        comparison("input:a", CmpOp::Gt, 0.0),
        vec![Action::Set {
            key: "output:entered".to_string(),
            value: Some(Literal::Bool(true)),
            expr: None,
            emit: EmitMode::OnEnter,
        }],
    );
    let mut state = CycleState::default();

    state.begin_cycle(snapshot(&[("input:a", Value::Number(1.0))]), 0);
    evaluate_rule(&rule, &mut state);
    assert_eq!(state.take_emissions().len(), 1);

    // Still true: no new emission.
    state.begin_cycle(snapshot(&[("input:a", Value::Number(2.0))]), 100);
    evaluate_rule(&rule, &mut state);
    assert!(state.take_emissions().is_empty());

    // Falls false, then true again: a fresh edge.
    state.begin_cycle(snapshot(&[("input:a", Value::Number(-1.0))]), 200);
    evaluate_rule(&rule, &mut state);
    assert!(state.take_emissions().is_empty());

    state.begin_cycle(snapshot(&[("input:a", Value::Number(3.0))]), 300);
    evaluate_rule(&rule, &mut state);
    assert_eq!(state.take_emissions().len(), 1);
}

// ---------------------------------------------------------------------------
// Action literals
// ---------------------------------------------------------------------------

#[test]
fn now_literal_writes_an_iso_timestamp() {
    let rule = rule_with(
        comparison("input:a", CmpOp::Gt, 0.0),
        vec![set_action("output:at", Literal::Str("now()".to_string()))],
    );
    let mut state = CycleState::default();
    state.begin_cycle(snapshot(&[("input:a", Value::Number(1.0))]), 1_700_000_000_000);
    evaluate_rule(&rule, &mut state);

    match state.take_emissions().pop() {
        Some(Emission::Set {
            value: Some(Value::Str(ts)),
            ..
        }) => {
            assert!(ts.starts_with("2023-11-14T"), "unexpected timestamp {ts}");
            assert!(ts.ends_with('Z'));
        }
        other => panic!("expected a string set, got {other:?}"),
    }
}

#[test]
fn dollar_input_maps_to_the_canonical_input() {
    let rule = CompiledRule {
        canonical_input: Some("input:temperature".to_string()),
        ..rule_with(
            comparison("input:temperature", CmpOp::Gt, 0.0),
            vec![set_action("output:echo", Literal::Str("$input".to_string()))],
        )
    };
    let mut state = CycleState::default();
    state.begin_cycle(snapshot(&[("input:temperature", Value::Number(21.5))]), 0);
    evaluate_rule(&rule, &mut state);

    assert_eq!(
        state.take_emissions(),
        vec![Emission::Set {
            key: "output:echo".to_string(),
            value: Some(Value::Number(21.5)),
        }]
    );
}

#[test]
fn buffer_action_appends_with_cap() {
    let rule = CompiledRule {
        canonical_input: Some("input:t".to_string()),
        ..rule_with(
            comparison("input:t", CmpOp::Gt, 0.0),
            vec![Action::Buffer {
                key: "buffer:history".to_string(),
                expr: None,
                max_samples: Some(3),
                emit: EmitMode::Always,
            }],
        )
    };
    let mut state = CycleState::default();
    for i in 0..5 {
        state.begin_cycle(snapshot(&[("input:t", Value::Number(i as f64 + 1.0))]), i * 100);
        evaluate_rule(&rule, &mut state);
    }
    assert_eq!(state.buffers.len_of("buffer:history"), 3);
    assert_eq!(
        state.buffers.latest("buffer:history"),
        Some(&(Value::Number(5.0), 400))
    );
}
