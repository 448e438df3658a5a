use async_trait::async_trait;
use hookflow_core::{ExecutionContext, Node, Outcome, RequestInfo, ResponseSink};
use serde_json::json;

use super::respond::status_code;
use super::{timestamp, Block};
use crate::interpolate::interpolate_in;

/// Terminal error response: `{success: false, status, error: {code, message}}`.
pub struct SendError;

#[async_trait]
impl Block for SendError {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let code = status_code(node, "code", ctx, 400);
        let message = interpolate_in(&node.text("message"), ctx);

        let envelope = json!({
            "success": false,
            "status": code,
            "error": {
                "code": code,
                "message": message,
            },
            "metadata": {
                "timestamp": timestamp(),
            },
        });

        if response.is_sent() {
            tracing::warn!(node = %node.id, "response already sent");
            return Outcome::output(envelope);
        }
        response.send_json(code, envelope.clone());
        Outcome::output(envelope).sent()
    }
}
