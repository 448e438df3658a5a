use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{map, map_res, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::ast::{BinOp, Expr, Literal, UnaryOp};

type ParseResult<'a, T> = IResult<&'a str, T>;

/// Deepest parenthesis or prefix-operator nesting accepted.
pub const MAX_NESTING: usize = 64;

/// Longest expression accepted, not counting string literal contents.
pub const MAX_LENGTH: usize = 2048;

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> ParseResult<'a, O>
where
    F: FnMut(&'a str) -> ParseResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

pub fn expression(input: &str) -> ParseResult<'_, Expr> {
    ws(or_expr)(input)
}

fn left_assoc<'a>(
    input: &'a str,
    operand: fn(&'a str) -> ParseResult<'a, Expr>,
    operator: fn(&'a str) -> ParseResult<'a, BinOp>,
) -> ParseResult<'a, Expr> {
    let (input, first) = operand(input)?;
    fold_many0(
        pair(ws(operator), operand),
        move || first.clone(),
        |lhs, (op, rhs)| Expr::binary(lhs, op, rhs),
    )(input)
}

fn or_expr(input: &str) -> ParseResult<'_, Expr> {
    left_assoc(input, and_expr, |i| value(BinOp::Or, tag("||"))(i))
}

fn and_expr(input: &str) -> ParseResult<'_, Expr> {
    left_assoc(input, equality, |i| value(BinOp::And, tag("&&"))(i))
}

fn equality(input: &str) -> ParseResult<'_, Expr> {
    left_assoc(input, comparison, |i| {
        alt((
            value(BinOp::StrictEqual, tag("===")),
            value(BinOp::StrictNotEqual, tag("!==")),
            value(BinOp::Equal, tag("==")),
            value(BinOp::NotEqual, tag("!=")),
        ))(i)
    })
}

fn comparison(input: &str) -> ParseResult<'_, Expr> {
    left_assoc(input, additive, |i| {
        alt((
            value(BinOp::LessOrEqual, tag("<=")),
            value(BinOp::GreaterOrEqual, tag(">=")),
            value(BinOp::Less, char('<')),
            value(BinOp::Greater, char('>')),
        ))(i)
    })
}

fn additive(input: &str) -> ParseResult<'_, Expr> {
    left_assoc(input, term, |i| {
        alt((value(BinOp::Add, char('+')), value(BinOp::Sub, char('-'))))(i)
    })
}

fn term(input: &str) -> ParseResult<'_, Expr> {
    left_assoc(input, unary, |i| {
        alt((
            value(BinOp::Mul, char('*')),
            value(BinOp::Div, char('/')),
            value(BinOp::Rem, char('%')),
        ))(i)
    })
}

/// Prefix operators are collected iteratively; only parentheses recurse.
fn unary(input: &str) -> ParseResult<'_, Expr> {
    let (input, ops) = many0(ws(alt((
        value(UnaryOp::Not, char('!')),
        value(UnaryOp::Neg, char('-')),
        value(UnaryOp::Plus, char('+')),
    ))))(input)?;
    if ops.len() > MAX_NESTING {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
    }
    let (input, operand) = primary(input)?;
    let expr = ops
        .into_iter()
        .rev()
        .fold(operand, |expr, op| Expr::Unary(op, Box::new(expr)));
    Ok((input, expr))
}

fn primary(input: &str) -> ParseResult<'_, Expr> {
    ws(alt((
        map(number, |n| Expr::Literal(Literal::Number(n))),
        map(string, |s| Expr::Literal(Literal::String(s))),
        map(keyword("true"), |_| Expr::Literal(Literal::Bool(true))),
        map(keyword("false"), |_| Expr::Literal(Literal::Bool(false))),
        map(keyword("null"), |_| Expr::Literal(Literal::Null)),
        map(keyword("undefined"), |_| Expr::Literal(Literal::Null)),
        delimited(char('('), ws(or_expr), char(')')),
    )))(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    terminated(
        tag(word),
        not(satisfy(|c: char| c.is_alphanumeric() || c == '_')),
    )
}

fn number(input: &str) -> ParseResult<'_, f64> {
    map_res(
        recognize(pair(
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        )),
        |s: &str| s.parse::<f64>(),
    )(input)
}

fn string(input: &str) -> ParseResult<'_, String> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('\'' | '"'))) => q,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let mut out = String::new();
    let mut escaped = false;
    for (idx, c) in chars {
        if escaped {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((&input[idx + c.len_utf8()..], out));
        } else {
            out.push(c);
        }
    }

    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

#[cfg(test)]
mod tests {
    use super::MAX_NESTING;
    use crate::{parse, BinOp, Expr, Literal, UnaryOp};

    fn num(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("42").unwrap(), num(42.0));
        assert_eq!(parse(" 1.5e2 ").unwrap(), num(150.0));
        assert_eq!(parse(".5").unwrap(), num(0.5));
        assert_eq!(
            parse("'it\\'s'").unwrap(),
            Expr::Literal(Literal::String("it's".into()))
        );
        assert_eq!(
            parse("\"a b\"").unwrap(),
            Expr::Literal(Literal::String("a b".into()))
        );
        assert_eq!(parse("true").unwrap(), Expr::Literal(Literal::Bool(true)));
        assert_eq!(parse("null").unwrap(), Expr::Literal(Literal::Null));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::binary(num(1.0), BinOp::Add, Expr::binary(num(2.0), BinOp::Mul, num(3.0)))
        );
        assert_eq!(
            parse("(1 + 2) * 3").unwrap(),
            Expr::binary(Expr::binary(num(1.0), BinOp::Add, num(2.0)), BinOp::Mul, num(3.0))
        );
        assert_eq!(
            parse("1 - 2 - 3").unwrap(),
            Expr::binary(Expr::binary(num(1.0), BinOp::Sub, num(2.0)), BinOp::Sub, num(3.0))
        );
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(
            parse("1 < 2 && 3 >= 3 || false").unwrap(),
            Expr::binary(
                Expr::binary(
                    Expr::binary(num(1.0), BinOp::Less, num(2.0)),
                    BinOp::And,
                    Expr::binary(num(3.0), BinOp::GreaterOrEqual, num(3.0)),
                ),
                BinOp::Or,
                Expr::Literal(Literal::Bool(false)),
            )
        );
        assert_eq!(
            parse("1 !== '1'").unwrap(),
            Expr::binary(
                num(1.0),
                BinOp::StrictNotEqual,
                Expr::Literal(Literal::String("1".into()))
            )
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            parse("-2").unwrap(),
            Expr::Unary(UnaryOp::Neg, Box::new(num(2.0)))
        );
        assert_eq!(
            parse("!!true").unwrap(),
            Expr::Unary(
                UnaryOp::Not,
                Box::new(Expr::Unary(
                    UnaryOp::Not,
                    Box::new(Expr::Literal(Literal::Bool(true)))
                ))
            )
        );
    }

    #[test]
    fn test_nesting_limits() {
        let nested = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&nested).unwrap(), num(1.0));

        assert!(parse(&"(".repeat(2000)).is_err());
        assert!(parse(&format!("{}1{}", "(".repeat(65), ")".repeat(65))).is_err());
        assert!(parse(&format!("{}true", "!".repeat(20_000))).is_err());
        assert!(parse(&format!("{}1", "-".repeat(MAX_NESTING + 1))).is_err());
        assert!(parse(&"1+".repeat(5000)).is_err());
    }

    #[test]
    fn test_string_contents_do_not_count() {
        let text = format!("'{}' == 'x'", "(".repeat(5000));
        assert!(parse(&text).is_ok());
    }

    #[test]
    fn test_rejects_non_grammar_input() {
        assert!(parse("").is_err());
        assert!(parse("Ava").is_err());
        assert!(parse("trueish").is_err());
        assert!(parse("1 +").is_err());
        assert!(parse("(1").is_err());
        assert!(parse("'open").is_err());
        assert!(parse("alert(1)").is_err());
        assert!(parse("1 = 1").is_err());
    }
}
