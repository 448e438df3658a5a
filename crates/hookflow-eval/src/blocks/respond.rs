use async_trait::async_trait;
use hookflow_core::{ExecutionContext, Node, Outcome, RequestInfo, ResponseSink};
use serde_json::{json, Map, Value};

use super::{timestamp, Block};
use crate::interpolate::interpolate_in;

const RESERVED: &[&str] = &["success", "status", "metadata"];

/// Terminal success response.
///
/// Writes `{success, status, message, metadata}`; configured `fields`
/// replace `message` and are spread into the envelope.
pub struct Respond;

/// Interpolated status code, or `fallback` when absent or not a valid HTTP
/// status.
pub(super) fn status_code(node: &Node, key: &str, ctx: &ExecutionContext, fallback: u16) -> u16 {
    let Some(raw) = node.non_empty(key) else {
        return fallback;
    };
    let text = interpolate_in(&raw, ctx);
    match text.trim().parse::<f64>() {
        Ok(n) if n.fract() == 0.0 && (100.0..=599.0).contains(&n) => n as u16,
        _ => {
            tracing::warn!(node = %node.id, status = %text, "invalid status code, using {}", fallback);
            fallback
        }
    }
}

#[async_trait]
impl Block for Respond {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let status = status_code(node, "status", ctx, 200);

        let mut envelope = Map::new();
        envelope.insert("success".into(), json!(true));
        envelope.insert("status".into(), json!(status));

        let fields = node.pairs("fields");
        if fields.is_empty() {
            let message = interpolate_in(&node.text("message"), ctx);
            envelope.insert("message".into(), Value::String(message));
        } else {
            for (key, template) in fields {
                if RESERVED.contains(&key.as_str()) {
                    tracing::warn!(node = %node.id, field = %key, "reserved response field skipped");
                    continue;
                }
                envelope.insert(key, Value::String(interpolate_in(&template, ctx)));
            }
        }
        envelope.insert("metadata".into(), json!({ "timestamp": timestamp() }));

        let envelope = Value::Object(envelope);
        if response.is_sent() {
            tracing::warn!(node = %node.id, "response already sent");
            return Outcome::output(envelope);
        }
        response.send_json(status, envelope.clone());
        Outcome::output(envelope).sent()
    }
}
