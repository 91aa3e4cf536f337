use winnow::ascii::multispace0;
use winnow::combinator::{alt, opt};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    // First character must be alphabetic or underscore (not digit).
    if !input.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

/// Sensor identifier: a bare ident, or `input:`/`output:`/`buffer:` followed
/// by a name. Other `ident:` shapes stop at the ident (the colon is left for
/// the caller, so it surfaces as a syntax error at the expression level).
pub fn sensor_ident(input: &mut &str) -> ModalResult<String> {
    let first = ident.parse_next(input)?;
    if matches!(first, "input" | "output" | "buffer") {
        let saved = *input;
        if opt(literal(":")).parse_next(input)?.is_some() {
            let suffix: ModalResult<&str> =
                take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input);
            match suffix {
                Ok(rest) => return Ok(format!("{first}:{rest}")),
                Err(_) => *input = saved,
            }
        }
    }
    Ok(first.to_string())
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// String literal, single- or double-quoted.
pub fn quoted_string(input: &mut &str) -> ModalResult<String> {
    let quote = alt((literal("\""), literal("'"))).parse_next(input)?;
    let terminator = quote.chars().next().unwrap_or('"');
    let content = take_while(0.., |c: char| c != terminator).parse_next(input)?;
    winnow::combinator::cut_err(literal(quote))
        .context(StrContext::Expected(StrContextValue::Description(
            "closing quote",
        )))
        .parse_next(input)?;
    Ok(content.to_string())
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

pub fn ws_skip(input: &mut &str) -> ModalResult<()> {
    let _ = multispace0.parse_next(input)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Keyword matching with word boundary
// ---------------------------------------------------------------------------

/// Match an exact keyword string, ensuring it's not a prefix of a longer
/// identifier (i.e. the next character is not alphanumeric or `_`).
pub fn kw<'a>(keyword: &'static str) -> impl FnMut(&mut &'a str) -> ModalResult<()> {
    move |input: &mut &'a str| {
        let saved = *input;
        literal(keyword).parse_next(input)?;
        if input.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            *input = saved;
            return Err(ErrMode::Backtrack(ContextError::new()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Number literal
// ---------------------------------------------------------------------------

/// Parse a number literal: integer or float.
pub fn number_literal(input: &mut &str) -> ModalResult<f64> {
    let integer_part = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let has_dot = opt(literal(".")).parse_next(input)?.is_some();
    if has_dot {
        let frac_part = take_while(1.., |c: char| c.is_ascii_digit())
            .context(StrContext::Expected(StrContextValue::Description(
                "digits after decimal point",
            )))
            .parse_next(input)?;
        let s = format!("{integer_part}.{frac_part}");
        let v: f64 = s.parse().map_err(|_| ErrMode::Cut(ContextError::new()))?;
        Ok(v)
    } else {
        let v: f64 = integer_part
            .parse()
            .map_err(|_| ErrMode::Cut(ContextError::new()))?;
        Ok(v)
    }
}
