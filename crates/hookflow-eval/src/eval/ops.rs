use std::cmp::Ordering;

use hookflow_core::value::{number, parse_number, render, type_name};
use hookflow_core::{HookflowError, Result};
use hookflow_parser::BinOp;
use serde_json::Value;

/// Numeric view used by arithmetic: null is 0, blank text is 0, booleans are
/// 0/1, other text must look numeric.
fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn numeric_operands(left: &Value, right: &Value, op: &str) -> Result<(f64, f64)> {
    match (to_number(left), to_number(right)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(HookflowError::TypeError {
            expected: format!("numbers for {}", op),
            actual: format!("{} and {}", type_name(left), type_name(right)),
        }),
    }
}

pub fn eval_unary_minus(value: &Value) -> Result<Value> {
    match to_number(value) {
        Some(n) => Ok(number(-n)),
        None => Err(HookflowError::TypeError {
            expected: "number".into(),
            actual: type_name(value).into(),
        }),
    }
}

pub fn eval_unary_plus(value: &Value) -> Result<Value> {
    match to_number(value) {
        Some(n) => Ok(number(n)),
        None => Err(HookflowError::TypeError {
            expected: "number".into(),
            actual: type_name(value).into(),
        }),
    }
}

/// Non short-circuit binary operators.
pub fn eval_binary_op(left: &Value, op: BinOp, right: &Value) -> Result<Value> {
    match op {
        BinOp::Add => eval_add(left, right),
        BinOp::Sub => eval_sub(left, right),
        BinOp::Mul => eval_mul(left, right),
        BinOp::Div => eval_div(left, right),
        BinOp::Rem => eval_rem(left, right),
        BinOp::Equal => Ok(Value::Bool(loose_equals(left, right))),
        BinOp::NotEqual => Ok(Value::Bool(!loose_equals(left, right))),
        BinOp::StrictEqual => Ok(Value::Bool(strict_equals(left, right))),
        BinOp::StrictNotEqual => Ok(Value::Bool(!strict_equals(left, right))),
        BinOp::Less => Ok(eval_compare(left, right, |o| o.is_lt())),
        BinOp::LessOrEqual => Ok(eval_compare(left, right, |o| o.is_le())),
        BinOp::Greater => Ok(eval_compare(left, right, |o| o.is_gt())),
        BinOp::GreaterOrEqual => Ok(eval_compare(left, right, |o| o.is_ge())),
        BinOp::And | BinOp::Or => Err(HookflowError::evaluation(
            "logical operators are evaluated lazily",
        )),
    }
}

pub fn eval_add(left: &Value, right: &Value) -> Result<Value> {
    if left.is_string() || right.is_string() {
        return Ok(Value::String(format!("{}{}", render(left), render(right))));
    }
    let (a, b) = numeric_operands(left, right, "+")?;
    Ok(number(a + b))
}

pub fn eval_sub(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = numeric_operands(left, right, "-")?;
    Ok(number(a - b))
}

pub fn eval_mul(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = numeric_operands(left, right, "*")?;
    Ok(number(a * b))
}

pub fn eval_div(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = numeric_operands(left, right, "/")?;
    if b == 0.0 {
        return Err(HookflowError::DivisionByZero);
    }
    Ok(number(a / b))
}

pub fn eval_rem(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = numeric_operands(left, right, "%")?;
    if b == 0.0 {
        return Err(HookflowError::DivisionByZero);
    }
    Ok(number(a % b))
}

pub fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

pub fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(_), Value::Number(_)) => strict_equals(left, right),
        _ => match (to_number(left), to_number(right)) {
            (Some(a), Some(b)) => a == b,
            _ => render(left) == render(right),
        },
    }
}

/// Text compares lexicographically when both sides are text, everything
/// else numerically; an operand without a numeric view never compares.
pub fn eval_compare<F>(left: &Value, right: &Value, pred: F) -> Value
where
    F: Fn(Ordering) -> bool,
{
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (to_number(left), to_number(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    Value::Bool(ordering.map(pred).unwrap_or(false))
}
