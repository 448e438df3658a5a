mod ops;

pub use ops::eval_binary_op;

use hookflow_core::value::{is_truthy, number};
use hookflow_core::Result;
use hookflow_parser::{BinOp, Expr, Literal, UnaryOp};
use serde_json::Value;

pub fn eval_expr(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Literal(literal) => Ok(eval_literal(literal)),

        Expr::Unary(op, operand) => {
            let value = eval_expr(operand)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                UnaryOp::Neg => ops::eval_unary_minus(&value),
                UnaryOp::Plus => ops::eval_unary_plus(&value),
            }
        }

        Expr::Binary(left, BinOp::And, right) => {
            let left = eval_expr(left)?;
            if is_truthy(&left) {
                eval_expr(right)
            } else {
                Ok(left)
            }
        }

        Expr::Binary(left, BinOp::Or, right) => {
            let left = eval_expr(left)?;
            if is_truthy(&left) {
                Ok(left)
            } else {
                eval_expr(right)
            }
        }

        Expr::Binary(left, op, right) => {
            let left = eval_expr(left)?;
            let right = eval_expr(right)?;
            ops::eval_binary_op(&left, *op, &right)
        }
    }
}

fn eval_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Number(n) => number(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Parses and evaluates `source` in one step.
pub fn eval_str(source: &str) -> Result<Value> {
    let expr = hookflow_parser::parse(source)?;
    eval_expr(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookflow_core::HookflowError;
    use serde_json::json;

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), json!(7));
        assert_eq!(eval_str("(1 + 2) * 3").unwrap(), json!(9));
        assert_eq!(eval_str("7 % 4").unwrap(), json!(3));
        assert_eq!(eval_str("10 / 4").unwrap(), json!(2.5));
        assert_eq!(eval_str("-(2 + 3)").unwrap(), json!(-5));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval_str("'a' + 1").unwrap(), json!("a1"));
        assert_eq!(eval_str("\"x\" + \"y\"").unwrap(), json!("xy"));
    }

    #[test]
    fn test_logic_returns_operands() {
        assert_eq!(eval_str("(1 < 2) && true").unwrap(), json!(true));
        assert_eq!(eval_str("0 || 'fallback'").unwrap(), json!("fallback"));
        assert_eq!(eval_str("'' && 1").unwrap(), json!(""));
        assert_eq!(eval_str("!0").unwrap(), json!(true));
    }

    #[test]
    fn test_short_circuit_skips_errors() {
        assert_eq!(eval_str("false && 1 / 0").unwrap(), json!(false));
        assert_eq!(eval_str("true || 1 / 0").unwrap(), json!(true));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval_str("12 < 18").unwrap(), json!(true));
        assert_eq!(eval_str("'18' == 18").unwrap(), json!(true));
        assert_eq!(eval_str("'18' === 18").unwrap(), json!(false));
        assert_eq!(eval_str("null == null").unwrap(), json!(true));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(eval_str("1 / 0"), Err(HookflowError::DivisionByZero)));
        assert!(matches!(eval_str("Ava == 'Ava'"), Err(HookflowError::ParseError { .. })));
    }
}
