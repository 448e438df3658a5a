use async_trait::async_trait;
use hookflow_core::value::{coerce_literal, is_nullish, is_truthy, render};
use hookflow_core::{
    Branch, ExecutionContext, HookflowError, Node, Outcome, RequestInfo, ResponseSink, Result,
};
use hookflow_parser::BinOp;
use serde_json::Value;

use super::Block;
use crate::eval::{eval_binary_op, eval_str};
use crate::interpolate::interpolate_in;

/// Decides between the `condition` and `else` children.
///
/// A structured comparison (`expression1`, `comparison`, `expression2`)
/// takes precedence over a free-form `condition` expression.
pub struct Condition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Binary(BinOp),
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
}

impl Comparison {
    fn parse(text: &str) -> Option<Comparison> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_lowercase().as_str() {
            "contains" => Some(Comparison::Contains),
            "not contains" | "does not contain" => Some(Comparison::NotContains),
            "starts with" => Some(Comparison::StartsWith),
            "ends with" => Some(Comparison::EndsWith),
            "is null" | "is empty" => Some(Comparison::IsNull),
            "is not null" | "is not empty" => Some(Comparison::IsNotNull),
            symbol => BinOp::comparison(symbol).map(Comparison::Binary),
        }
    }
}

fn compare(left: &str, comparison: Comparison, right: &str) -> Result<bool> {
    match comparison {
        Comparison::IsNull => Ok(is_nullish(&Value::String(left.trim().to_string()))),
        Comparison::IsNotNull => Ok(!is_nullish(&Value::String(left.trim().to_string()))),
        Comparison::Binary(op) => {
            let value = eval_binary_op(&coerce_literal(left), op, &coerce_literal(right))?;
            Ok(is_truthy(&value))
        }
        text_op => {
            let left = render(&coerce_literal(left));
            let right = render(&coerce_literal(right));
            Ok(match text_op {
                Comparison::Contains => left.contains(&right),
                Comparison::NotContains => !left.contains(&right),
                Comparison::StartsWith => left.starts_with(&right),
                Comparison::EndsWith => left.ends_with(&right),
                _ => false,
            })
        }
    }
}

impl Condition {
    fn decide(&self, node: &Node, ctx: &ExecutionContext) -> Option<Result<bool>> {
        if let Some(symbol) = node.non_empty("comparison") {
            let Some(comparison) = Comparison::parse(&symbol) else {
                return Some(Err(HookflowError::evaluation(format!(
                    "unknown comparison '{}'",
                    symbol
                ))));
            };
            let left = interpolate_in(&node.text("expression1"), ctx);
            let right = interpolate_in(&node.text("expression2"), ctx);
            return Some(compare(&left, comparison, &right));
        }

        let expression = node.non_empty("condition")?;
        let replaced = interpolate_in(&expression, ctx);
        Some(eval_str(&replaced).map(|value| is_truthy(&value)))
    }
}

#[async_trait]
impl Block for Condition {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let decision = match self.decide(node, ctx) {
            Some(Ok(decision)) => decision,
            Some(Err(e)) => {
                tracing::error!(node = %node.id, error = %e, "condition evaluation failed");
                false
            }
            None => {
                tracing::warn!(node = %node.id, "no condition configured");
                false
            }
        };

        tracing::debug!(node = %node.id, decision, "condition decided");
        ctx.record_decision(decision);
        Outcome::branch(Branch::from_decision(decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::testing;
    use hookflow_core::BufferedResponse;
    use serde_json::json;

    async fn decide(node: Node, ctx: &mut ExecutionContext) -> Outcome {
        let mut res = BufferedResponse::new();
        Condition.run(&node, &testing::request(), &mut res, ctx).await
    }

    fn free_form(expression: &str) -> Node {
        Node::new("c", "condition").with_data("condition", expression)
    }

    fn structured(left: &str, op: &str, right: &str) -> Node {
        Node::new("c", "condition")
            .with_data("expression1", left)
            .with_data("comparison", op)
            .with_data("expression2", right)
    }

    #[tokio::test]
    async fn test_free_form_condition() {
        let mut ctx = testing::context();
        ctx.params.insert("age".into(), json!("12"));

        let outcome = decide(free_form("{params.age} < 18"), &mut ctx).await;
        assert_eq!(outcome.branch, Some(Branch::Condition));
        assert_eq!(ctx.last_decision, Some(true));

        let outcome = decide(free_form("{params.age} >= 18"), &mut ctx).await;
        assert_eq!(outcome.branch, Some(Branch::Else));
        assert_eq!(ctx.last_decision, Some(false));
    }

    #[tokio::test]
    async fn test_invalid_expression_is_false() {
        let mut ctx = testing::context();
        let outcome = decide(free_form("{params.name} == 'World'"), &mut ctx).await;
        assert_eq!(outcome.branch, Some(Branch::Else));
        assert_eq!(ctx.last_decision, Some(false));
    }

    #[tokio::test]
    async fn test_deeply_nested_input_is_false() {
        let mut ctx = testing::context();
        ctx.params.insert("x".into(), json!("(".repeat(2000)));
        let outcome = decide(free_form("{params.x} == 1"), &mut ctx).await;
        assert_eq!(outcome.branch, Some(Branch::Else));
        assert_eq!(ctx.last_decision, Some(false));

        ctx.params.insert("x".into(), json!("!".repeat(20_000)));
        let outcome = decide(free_form("{params.x}true"), &mut ctx).await;
        assert_eq!(outcome.branch, Some(Branch::Else));
    }

    #[tokio::test]
    async fn test_missing_configuration_goes_to_else() {
        let mut ctx = testing::context();
        ctx.record_decision(true);
        let outcome = decide(Node::new("c", "condition"), &mut ctx).await;
        assert_eq!(outcome.branch, Some(Branch::Else));
        assert_eq!(ctx.last_decision, Some(false));
    }

    #[tokio::test]
    async fn test_structured_comparisons() {
        let mut ctx = testing::context();
        let cases = [
            ("{params.name}", "==", "World", true),
            ("{params.name}", "===", "'World'", true),
            ("18", "==", "'18'", true),
            ("18", "===", "'18'", false),
            ("9", "<", "10", true),
            ("{params.name}", "contains", "orl", true),
            ("{params.name}", "not contains", "orl", false),
            ("{params.name}", "starts with", "Wo", true),
            ("{params.name}", "ends with", "x", false),
            ("{params.missing}", "is null", "", true),
            ("{params.name}", "is not null", "", true),
        ];
        for (left, op, right, expected) in cases {
            decide(structured(left, op, right), &mut ctx).await;
            assert_eq!(
                ctx.last_decision,
                Some(expected),
                "{} {} {}",
                left,
                op,
                right
            );
        }
    }

    #[tokio::test]
    async fn test_structured_wins_over_free_form() {
        let mut ctx = testing::context();
        let node = structured("1", "==", "2").with_data("condition", "true");
        let outcome = decide(node, &mut ctx).await;
        assert_eq!(outcome.branch, Some(Branch::Else));
    }

    #[tokio::test]
    async fn test_unknown_comparison_is_false() {
        let mut ctx = testing::context();
        decide(structured("1", "~=", "1"), &mut ctx).await;
        assert_eq!(ctx.last_decision, Some(false));
    }
}
