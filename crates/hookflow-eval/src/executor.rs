use std::sync::Arc;

use async_recursion::async_recursion;
use hookflow_core::{
    BufferedResponse, ExecutionContext, Flow, Node, Outcome, ProviderError, RequestInfo,
    ResponseSink, SentResponse,
};
use serde_json::Value;
use tracing::Instrument;

use crate::blocks::{Block, BlockRegistry};

/// Result of one complete flow execution.
#[derive(Debug)]
pub struct FlowRun {
    pub outputs: Vec<Value>,
    pub response: Option<SentResponse>,
    pub context: ExecutionContext,
}

impl FlowRun {
    pub fn last_error(&self) -> Option<&ProviderError> {
        self.context.last_error.as_ref()
    }
}

/// Walks flow trees depth-first, dispatching each node to its block.
#[derive(Clone)]
pub struct Executor {
    registry: Arc<BlockRegistry>,
}

impl Executor {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Executor { registry }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Runs `flow` for `request` with a fresh context and a buffered response.
    pub async fn execute(&self, flow: Arc<Flow>, request: &RequestInfo) -> FlowRun {
        let span = tracing::info_span!("flow", flow.slug = %flow.slug());
        async move {
            let mut context = ExecutionContext::new(flow.clone());
            let mut response = BufferedResponse::new();
            let outputs = self
                .run_flow(Some(flow.root()), request, &mut response, &mut context)
                .await;
            tracing::debug!(outputs = outputs.len(), sent = response.is_sent(), "flow finished");
            FlowRun {
                outputs,
                response: response.into_response(),
                context,
            }
        }
        .instrument(span)
        .await
    }

    /// Executes `node` and its subtree, returning the collected outputs in
    /// depth-first order.
    pub async fn run_flow(
        &self,
        node: Option<&Node>,
        request: &RequestInfo,
        response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Vec<Value> {
        ctx.initialize(request);
        match node {
            Some(node) => self.walk(node, request, response, ctx).await,
            None => Vec::new(),
        }
    }

    #[async_recursion]
    async fn walk(
        &self,
        node: &Node,
        request: &RequestInfo,
        response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Vec<Value> {
        let mut outputs = Vec::new();

        let block = self.registry.get(&node.kind);
        let outcome = match &block {
            Some(block) => {
                let span = tracing::debug_span!("node", node.id = %node.id, node.type = %node.kind);
                block.run(node, request, response, ctx).instrument(span).await
            }
            None => {
                tracing::warn!(node = %node.id, kind = %node.kind, "unknown block type, skipping");
                Outcome::none()
            }
        };

        if let Some(output) = outcome.output.clone() {
            if node.kind == "request" {
                index_request_result(node, &output, ctx);
            }
            outputs.push(output);
        }

        if !outcome.continues() {
            tracing::debug!(node = %node.id, "branch stopped");
            return outputs;
        }

        for child in &node.children {
            if should_run(node, block.as_deref(), &outcome, child, ctx) {
                let child_outputs = self.walk(child, request, response, ctx).await;
                outputs.extend(child_outputs);
            }
        }

        outputs
    }
}

/// Makes a request result reachable as `{name.status}` and `{name.body...}`.
fn index_request_result(node: &Node, output: &Value, ctx: &mut ExecutionContext) {
    let key = node
        .non_empty("request_name")
        .unwrap_or_else(|| node.id.clone());
    let body = output.get("body").cloned().unwrap_or(Value::Null);
    ctx.set_variable(&format!("{}.body", key), body);
    ctx.set_variable(&key, output.clone());
}

fn should_run(
    node: &Node,
    block: Option<&dyn Block>,
    outcome: &Outcome,
    child: &Node,
    ctx: &ExecutionContext,
) -> bool {
    if let Some(decision) = block.and_then(|b| b.route(child, ctx)) {
        return decision;
    }
    if let Some(branch) = outcome.branch {
        return child.branch() == Some(branch);
    }
    if node.kind == "condition" {
        return match (ctx.last_decision, child.branch()) {
            (Some(decision), Some(branch)) => branch.matches(decision),
            _ => false,
        };
    }
    true
}
