use async_trait::async_trait;
use hookflow_core::{ExecutionContext, Node, Outcome, RequestInfo, ResponseSink};
use serde_json::{json, Value};

use super::Block;

/// Root node: publishes the endpoint metadata it carries.
pub struct Start;

#[async_trait]
impl Block for Start {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let query_params = match node.get("queryParams") {
            Some(Value::Array(items)) => Value::Array(items.clone()),
            _ => Value::Array(Vec::new()),
        };
        ctx.set_endpoint(json!({
            "slug": node.text("slug"),
            "queryParams": query_params,
        }));
        Outcome::none()
    }
}
