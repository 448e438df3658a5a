mod ast;
mod grammar;

pub use ast::{BinOp, Expr, Literal, UnaryOp};
pub use grammar::{MAX_LENGTH, MAX_NESTING};

use hookflow_core::{HookflowError, Result};

/// Parses one expression; the whole input must be consumed.
pub fn parse(source: &str) -> Result<Expr> {
    check_limits(source)?;
    match grammar::expression(source) {
        Ok((rest, expr)) if rest.is_empty() => Ok(expr),
        Ok((rest, _)) => Err(HookflowError::ParseError {
            offset: source.len() - rest.len(),
            message: format!("unexpected input '{}'", rest),
        }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(HookflowError::ParseError {
            offset: source.len() - e.input.len(),
            message: format!("expected {:?}", e.code),
        }),
        Err(nom::Err::Incomplete(_)) => Err(HookflowError::ParseError {
            offset: source.len(),
            message: "incomplete expression".into(),
        }),
    }
}

/// Bounds parenthesis depth and expression size before the grammar runs.
///
/// Quoted text is skipped, so string literals may contain anything.
fn check_limits(source: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut length = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in source.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        length += 1;
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }

        if depth > MAX_NESTING {
            return Err(HookflowError::ParseError {
                offset,
                message: format!("nesting deeper than {} levels", MAX_NESTING),
            });
        }
        if length > MAX_LENGTH {
            return Err(HookflowError::ParseError {
                offset,
                message: format!("expression longer than {} characters", MAX_LENGTH),
            });
        }
    }
    Ok(())
}
