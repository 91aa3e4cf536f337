use winnow::combinator::{alt, cut_err, opt};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::literal;

use crate::ast::*;
use crate::parse_utils::{ident, kw, number_literal, quoted_string, sensor_ident, ws_skip};

/// Parse a complete expression string, requiring all input to be consumed.
pub fn parse_expression(source: &str) -> Result<Expr, String> {
    let mut input = source;
    ws_skip
        .parse_next(&mut input)
        .map_err(|e| format!("invalid expression: {e}"))?;
    let expr = parse_expr(&mut input).map_err(|e| format!("invalid expression: {e}"))?;
    ws_skip
        .parse_next(&mut input)
        .map_err(|e| format!("invalid expression: {e}"))?;
    if !input.is_empty() {
        return Err(format!("unexpected trailing input: `{input}`"));
    }
    Ok(expr)
}

pub(crate) fn parse_expr(input: &mut &str) -> ModalResult<Expr> {
    or_expr.parse_next(input)
}

// ---------------------------------------------------------------------------
// Precedence levels (lowest to highest):
//   or < and < not < comparison < additive < multiplicative < unary < primary
// ---------------------------------------------------------------------------

/// `or_expr = and_expr { "or" and_expr }`
fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = and_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        if opt(kw("or")).parse_next(input)?.is_some() {
            ws_skip.parse_next(input)?;
            let right = cut_err(and_expr).parse_next(input)?;
            left = Expr::BinOp {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        } else {
            break;
        }
    }
    Ok(left)
}

/// `and_expr = not_expr { "and" not_expr }`
fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = not_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        if opt(kw("and")).parse_next(input)?.is_some() {
            ws_skip.parse_next(input)?;
            let right = cut_err(not_expr).parse_next(input)?;
            left = Expr::BinOp {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        } else {
            break;
        }
    }
    Ok(left)
}

/// `not_expr = "not" not_expr | cmp_expr`
fn not_expr(input: &mut &str) -> ModalResult<Expr> {
    if opt(kw("not")).parse_next(input)?.is_some() {
        ws_skip.parse_next(input)?;
        let inner = cut_err(not_expr).parse_next(input)?;
        Ok(Expr::Not(Box::new(inner)))
    } else {
        cmp_expr.parse_next(input)
    }
}

/// `cmp_expr = add_expr [cmp_op add_expr]` — comparisons do not chain.
fn cmp_expr(input: &mut &str) -> ModalResult<Expr> {
    let left = add_expr.parse_next(input)?;
    ws_skip.parse_next(input)?;
    if let Some(op) = opt(cmp_op).parse_next(input)? {
        ws_skip.parse_next(input)?;
        let right = cut_err(add_expr).parse_next(input)?;
        return Ok(Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
    }
    Ok(left)
}

fn cmp_op(input: &mut &str) -> ModalResult<BinOp> {
    alt((
        literal("==").value(BinOp::Eq),
        literal("!=").value(BinOp::Ne),
        literal("<=").value(BinOp::Le),
        literal(">=").value(BinOp::Ge),
        literal("<").value(BinOp::Lt),
        literal(">").value(BinOp::Gt),
    ))
    .parse_next(input)
}

/// `add_expr = mul_expr { ("+" | "-") mul_expr }`
fn add_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = mul_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        let op = opt(alt((
            literal("+").value(BinOp::Add),
            literal("-").value(BinOp::Sub),
        )))
        .parse_next(input)?;
        if let Some(op) = op {
            ws_skip.parse_next(input)?;
            let right = cut_err(mul_expr).parse_next(input)?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        } else {
            break;
        }
    }
    Ok(left)
}

/// `mul_expr = unary_expr { ("*" | "/") unary_expr }`
fn mul_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = unary_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        let op = opt(alt((
            literal("*").value(BinOp::Mul),
            literal("/").value(BinOp::Div),
        )))
        .parse_next(input)?;
        if let Some(op) = op {
            ws_skip.parse_next(input)?;
            let right = cut_err(unary_expr).parse_next(input)?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        } else {
            break;
        }
    }
    Ok(left)
}

/// `unary_expr = ["-"] primary`
fn unary_expr(input: &mut &str) -> ModalResult<Expr> {
    if opt(literal("-")).parse_next(input)?.is_some() {
        ws_skip.parse_next(input)?;
        let inner = primary.parse_next(input)?;
        Ok(Expr::Neg(Box::new(inner)))
    } else {
        primary.parse_next(input)
    }
}

// ---------------------------------------------------------------------------
// Primary
// ---------------------------------------------------------------------------

fn primary(input: &mut &str) -> ModalResult<Expr> {
    alt((
        number_literal.map(Expr::Number),
        quoted_string.map(Expr::StringLit),
        kw("true").map(|_| Expr::Bool(true)),
        kw("false").map(|_| Expr::Bool(false)),
        kw("null").map(|_| Expr::Null),
        paren_expr,
        ident_primary,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn paren_expr(input: &mut &str) -> ModalResult<Expr> {
    literal("(").parse_next(input)?;
    ws_skip.parse_next(input)?;
    let inner = cut_err(parse_expr).parse_next(input)?;
    ws_skip.parse_next(input)?;
    cut_err(literal(")")).parse_next(input)?;
    Ok(inner)
}

/// Function call or sensor reference. An ident followed by `(` must name a
/// known mathematical function; anything else is a sensor.
fn ident_primary(input: &mut &str) -> ModalResult<Expr> {
    let saved = *input;
    // Function call: bare ident + "(".
    if let Ok(name) = ident.parse_next(input) {
        ws_skip.parse_next(input)?;
        if opt(literal("(")).parse_next(input)?.is_some() {
            let Some(func) = MathFn::from_name(name) else {
                return Err(ErrMode::Cut(ContextError::new()));
            };
            return parse_func_args(func, input);
        }
        // Not a call: rewind and reparse as a sensor so the
        // `input:`/`output:` prefix forms are handled in one place.
    }
    *input = saved;
    sensor_ident.parse_next(input).map(Expr::Sensor)
}

fn parse_func_args(func: MathFn, input: &mut &str) -> ModalResult<Expr> {
    ws_skip.parse_next(input)?;
    let mut args = Vec::new();
    if opt(literal(")")).parse_next(input)?.is_none() {
        loop {
            ws_skip.parse_next(input)?;
            args.push(cut_err(parse_expr).parse_next(input)?);
            ws_skip.parse_next(input)?;
            if opt(literal(",")).parse_next(input)?.is_none() {
                break;
            }
        }
        cut_err(literal(")"))
            .context(StrContext::Expected(StrContextValue::Description(
                "closing parenthesis",
            )))
            .parse_next(input)?;
    }
    if args.len() != func.arity() {
        return Err(ErrMode::Cut(ContextError::new()));
    }
    Ok(Expr::Func { func, args })
}

#[cfg(test)]
mod tests;
