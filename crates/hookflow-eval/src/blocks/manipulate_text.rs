use async_trait::async_trait;
use hookflow_core::{ExecutionContext, Node, Outcome, RequestInfo, ResponseSink};
use serde_json::Value;

use super::{named_output, Block};
use crate::interpolate::interpolate_in;

/// Text transformations: `uppercase` (default), `lowercase`, `trim`,
/// `replace`, `split` and `concat`.
pub struct ManipulateText;

fn transform(node: &Node, ctx: &ExecutionContext, operation: &str, text: String) -> Value {
    match operation {
        "uppercase" => Value::String(text.to_uppercase()),
        "lowercase" => Value::String(text.to_lowercase()),
        "trim" => Value::String(text.trim().to_string()),
        "replace" => {
            let find = interpolate_in(&node.text("find"), ctx);
            if find.is_empty() {
                return Value::String(text);
            }
            let replacement = interpolate_in(&node.text("replace"), ctx);
            Value::String(text.replace(&find, &replacement))
        }
        "split" => {
            let delimiter = interpolate_in(&node.text("delimiter"), ctx);
            if delimiter.is_empty() {
                return Value::Array(vec![Value::String(text)]);
            }
            Value::Array(
                text.split(delimiter.as_str())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )
        }
        "concat" => {
            let additional = interpolate_in(&node.text("additional"), ctx);
            Value::String(text + &additional)
        }
        other => {
            tracing::warn!(node = %node.id, operation = other, "unknown text operation");
            Value::String(text)
        }
    }
}

#[async_trait]
impl Block for ManipulateText {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let text = interpolate_in(&node.text("text"), ctx);
        if text.is_empty() {
            tracing::warn!(node = %node.id, "manipulateText without input text");
            return Outcome::none();
        }

        let operation = node.non_empty("operation").unwrap_or_else(|| "uppercase".into());
        let result = transform(node, ctx, &operation, text);

        let name = node.non_empty("referenceVar");
        if let Some(name) = &name {
            ctx.assign(name, result.clone());
        }
        Outcome::output(named_output(name.as_deref(), result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::testing;
    use hookflow_core::BufferedResponse;
    use serde_json::json;

    async fn run(node: Node, ctx: &mut ExecutionContext) -> Outcome {
        let mut res = BufferedResponse::new();
        ManipulateText.run(&node, &testing::request(), &mut res, ctx).await
    }

    fn node(operation: &str) -> Node {
        Node::new("t", "manipulateText")
            .with_data("text", " {params.name} ")
            .with_data("operation", operation)
            .with_data("referenceVar", "out")
    }

    #[tokio::test]
    async fn test_operations() {
        let mut ctx = testing::context();
        let cases = [
            (node("uppercase"), json!(" WORLD ")),
            (node("lowercase"), json!(" world ")),
            (node("trim"), json!("World")),
            (node("replace").with_data("find", "o").with_data("replace", "0"), json!(" W0rld ")),
            (node("split").with_data("delimiter", "r"), json!([" Wo", "ld "])),
            (node("split"), json!([" World "])),
            (node("concat").with_data("additional", "!"), json!(" World !")),
            (node("reverse"), json!(" World ")),
        ];
        for (node, expected) in cases {
            let outcome = run(node, &mut ctx).await;
            assert_eq!(outcome.output, Some(json!({"out": expected.clone()})));
            assert_eq!(ctx.local.get("out"), Some(&expected));
            assert_eq!(ctx.result.get("out"), Some(&expected));
        }
    }

    #[tokio::test]
    async fn test_default_operation_and_unnamed_result() {
        let mut ctx = testing::context();
        let node = Node::new("t", "manipulateText").with_data("text", "abc");
        let outcome = run(node, &mut ctx).await;
        assert_eq!(outcome.output, Some(json!({"result": "ABC"})));
        assert!(ctx.local.is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_is_noop() {
        let mut ctx = testing::context();
        let node = Node::new("t", "manipulateText").with_data("text", "{params.missing}");
        assert_eq!(run(node, &mut ctx).await, Outcome::none());
    }
}
