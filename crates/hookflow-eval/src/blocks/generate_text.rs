use async_trait::async_trait;
use hookflow_core::value::as_number;
use hookflow_core::{
    ExecutionContext, Node, OpenAiConfig, Outcome, ProviderError, RequestInfo, ResponseSink,
};
use serde_json::{json, Value};

use super::provider::{missing_credentials, post_json, record_failure, scalar_text, transport_error};
use super::{named_output, Block};
use crate::interpolate::interpolate_in;

const SOURCE: &str = "openai";
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Text generation over the OpenAI Responses API.
pub struct GenerateText {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl GenerateText {
    pub fn new(client: reqwest::Client, config: OpenAiConfig) -> Self {
        GenerateText { client, config }
    }

    async fn generate(&self, model: &str, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| missing_credentials(SOURCE, &self.config.api_key_env))?;

        let url = format!("{}/responses", self.config.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": model,
            "input": prompt,
            "temperature": temperature,
            "store": false,
        });

        let reply = post_json(&self.client, &url, &api_key, &payload)
            .await
            .map_err(|e| transport_error(SOURCE, &e))?;
        if !reply.ok {
            return Err(api_error(&reply.body, reply.status));
        }
        Ok(output_text(&reply.body))
    }
}

fn api_error(body: &Value, status: u16) -> ProviderError {
    let error = body.get("error");
    let kind = error
        .and_then(|e| e.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("api_error");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown OpenAI error");
    ProviderError::new(SOURCE, kind, message)
        .with_code(scalar_text(error.and_then(|e| e.get("code"))))
        .with_status(Some(status))
}

/// Joins the assistant's `output_text` parts with newlines.
fn output_text(body: &Value) -> String {
    let Some(items) = body.get("output").and_then(Value::as_array) else {
        return String::new();
    };
    items
        .iter()
        .filter(|item| item["type"] == "message" && item["role"] == "assistant")
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part["type"] == "output_text")
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Block for GenerateText {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let prompt = interpolate_in(&node.text("prompt"), ctx);
        if prompt.is_empty() {
            tracing::warn!(node = %node.id, "generateText without a prompt");
            return Outcome::none();
        }

        let model = node
            .non_empty("model")
            .unwrap_or_else(|| self.config.model.clone());
        let temperature = node
            .get("temperature")
            .and_then(as_number)
            .filter(|t| *t != 0.0)
            .unwrap_or(DEFAULT_TEMPERATURE);
        let name = node.non_empty("referenceVar");

        tracing::debug!(node = %node.id, model = %model, "generating text");
        match self.generate(&model, &prompt, temperature).await {
            Ok(text) => {
                let value = Value::String(text);
                if let Some(name) = &name {
                    ctx.assign(name, value.clone());
                }
                Outcome::output(named_output(name.as_deref(), value))
            }
            Err(error) => {
                let message = Value::String(record_failure(ctx, error));
                if let Some(name) = &name {
                    ctx.assign(name, message.clone());
                }
                Outcome::output(named_output(name.as_deref(), message)).stop()
            }
        }
    }
}
