use async_trait::async_trait;
use hookflow_core::{ExecutionContext, Node, Outcome, RequestInfo, ResponseSink};
use serde_json::Value;

use super::{named_output, Block};
use crate::interpolate::interpolate_in;

/// Assigns an interpolated value to `local[name]`.
pub struct SetVar;

#[async_trait]
impl Block for SetVar {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let Some(name) = node.non_empty("name") else {
            tracing::warn!(node = %node.id, "setVar without a variable name");
            return Outcome::none();
        };

        let value = Value::String(interpolate_in(&node.text("value"), ctx));
        tracing::debug!(node = %node.id, name = %name, "local variable set");
        ctx.set_local(&name, value.clone());

        Outcome::output(named_output(Some(&name), value))
    }
}
