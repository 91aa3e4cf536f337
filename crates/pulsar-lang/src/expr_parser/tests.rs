use crate::ast::*;
use crate::expr_parser::parse_expression;

// -----------------------------------------------------------------------
// Precedence & structure
// -----------------------------------------------------------------------

#[test]
fn parse_comparison() {
    let e = parse_expression("temperature > 30").unwrap();
    match e {
        Expr::BinOp { op, left, right } => {
            assert_eq!(op, BinOp::Gt);
            assert_eq!(*left, Expr::Sensor("temperature".to_string()));
            assert_eq!(*right, Expr::Number(30.0));
        }
        other => panic!("expected BinOp, got {other:?}"),
    }
}

#[test]
fn or_binds_looser_than_and() {
    // a and b or c  ==  (a and b) or c
    let e = parse_expression("a and b or c").unwrap();
    match e {
        Expr::BinOp {
            op: BinOp::Or,
            left,
            ..
        } => assert!(matches!(*left, Expr::BinOp { op: BinOp::And, .. })),
        other => panic!("expected Or at the top, got {other:?}"),
    }
}

#[test]
fn not_binds_tighter_than_and() {
    // not a and b  ==  (not a) and b
    let e = parse_expression("not a and b").unwrap();
    match e {
        Expr::BinOp {
            op: BinOp::And,
            left,
            ..
        } => assert!(matches!(*left, Expr::Not(_))),
        other => panic!("expected And at the top, got {other:?}"),
    }
}

#[test]
fn comparison_binds_tighter_than_not() {
    // not x > 1  ==  not (x > 1)
    let e = parse_expression("not x > 1").unwrap();
    match e {
        Expr::Not(inner) => assert!(matches!(*inner, Expr::BinOp { op: BinOp::Gt, .. })),
        other => panic!("expected Not at the top, got {other:?}"),
    }
}

#[test]
fn arithmetic_precedence() {
    // 1 + 2 * 3  ==  1 + (2 * 3)
    let e = parse_expression("1 + 2 * 3").unwrap();
    match e {
        Expr::BinOp {
            op: BinOp::Add,
            right,
            ..
        } => assert!(matches!(*right, Expr::BinOp { op: BinOp::Mul, .. })),
        other => panic!("expected Add at the top, got {other:?}"),
    }
}

#[test]
fn parens_override_precedence() {
    let e = parse_expression("(1 + 2) * 3").unwrap();
    match e {
        Expr::BinOp {
            op: BinOp::Mul,
            left,
            ..
        } => assert!(matches!(*left, Expr::BinOp { op: BinOp::Add, .. })),
        other => panic!("expected Mul at the top, got {other:?}"),
    }
}

#[test]
fn unary_negation() {
    let e = parse_expression("-x + 1").unwrap();
    match e {
        Expr::BinOp {
            op: BinOp::Add,
            left,
            ..
        } => assert!(matches!(*left, Expr::Neg(_))),
        other => panic!("expected Add at the top, got {other:?}"),
    }
}

// -----------------------------------------------------------------------
// Literals & identifiers
// -----------------------------------------------------------------------

#[test]
fn prefixed_sensor_identifiers() {
    let e = parse_expression("input:temperature / 100").unwrap();
    match e {
        Expr::BinOp { left, .. } => {
            assert_eq!(*left, Expr::Sensor("input:temperature".to_string()))
        }
        other => panic!("expected BinOp, got {other:?}"),
    }
    let e = parse_expression("output:norm > 0.25").unwrap();
    match e {
        Expr::BinOp { left, .. } => assert_eq!(*left, Expr::Sensor("output:norm".to_string())),
        other => panic!("expected BinOp, got {other:?}"),
    }
}

#[test]
fn reserved_words_are_not_sensors() {
    assert_eq!(parse_expression("true").unwrap(), Expr::Bool(true));
    assert_eq!(parse_expression("false").unwrap(), Expr::Bool(false));
    assert_eq!(parse_expression("null").unwrap(), Expr::Null);
    // `trueish` is an ordinary identifier.
    assert_eq!(
        parse_expression("trueish").unwrap(),
        Expr::Sensor("trueish".to_string())
    );
}

#[test]
fn string_literals_single_and_double_quoted() {
    assert_eq!(
        parse_expression("status == \"ok\"").unwrap(),
        parse_expression("status == 'ok'").unwrap()
    );
}

#[test]
fn function_calls() {
    let e = parse_expression("max(abs(x), 1.5)").unwrap();
    match e {
        Expr::Func { func, args } => {
            assert_eq!(func, MathFn::Max);
            assert_eq!(args.len(), 2);
            assert!(matches!(
                &args[0],
                Expr::Func {
                    func: MathFn::Abs,
                    ..
                }
            ));
        }
        other => panic!("expected Func, got {other:?}"),
    }
}

// -----------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------

#[test]
fn unknown_function_is_rejected() {
    assert!(parse_expression("median(x)").is_err());
}

#[test]
fn wrong_arity_is_rejected() {
    assert!(parse_expression("sqrt(1, 2)").is_err());
    assert!(parse_expression("max(1)").is_err());
}

#[test]
fn trailing_garbage_is_rejected() {
    assert!(parse_expression("a > 1 )").is_err());
    assert!(parse_expression("a >> 1").is_err());
}

#[test]
fn sensor_extraction_walks_all_operands() {
    let e = parse_expression("input:a + max(b, output:c) > 2 and not d").unwrap();
    let mut out = Vec::new();
    e.sensors(&mut out);
    assert_eq!(out, vec!["input:a", "b", "output:c", "d"]);
}
