use async_trait::async_trait;
use hookflow_core::{ExecutionContext, Node, Outcome, ProviderError, RequestInfo, ResponseSink};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::{json, Map, Value};

use super::Block;
use crate::interpolate::interpolate_in;

/// Outbound HTTP call.
///
/// The result `{status, ok, body}` is returned as output; the executor
/// indexes it in `variables` under the node's `request_name`.
pub struct Request {
    client: reqwest::Client,
}

impl Request {
    pub fn new(client: reqwest::Client) -> Self {
        Request { client }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<Value, reqwest::Error> {
        let mut request = self.client.request(method, url);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await?;
        let body = if is_json {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        Ok(json!({
            "status": status.as_u16(),
            "ok": status.is_success(),
            "body": body,
        }))
    }
}

fn failure(ctx: &mut ExecutionContext, kind: &str, message: String) -> Outcome {
    tracing::error!(kind, "{}", message);
    ctx.record_error(ProviderError::new("request", kind, message.clone()).with_status(Some(500)));
    Outcome::output(json!({
        "status": 500,
        "ok": false,
        "body": { "error": message },
    }))
}

/// A reply outside 2xx, as a provider error; the result itself is still
/// returned so the flow can inspect it.
fn status_error(url: &str, result: &Value) -> Option<ProviderError> {
    if result["ok"].as_bool().unwrap_or(false) {
        return None;
    }
    let status = result["status"].as_u64().and_then(|s| u16::try_from(s).ok())?;
    let message = match &result["body"] {
        Value::String(text) if !text.trim().is_empty() => {
            format!("{} returned {}: {}", url, status, text.trim())
        }
        _ => format!("{} returned {}", url, status),
    };
    Some(
        ProviderError::new("request", "http_error", message)
            .with_code(Some(status.to_string()))
            .with_status(Some(status)),
    )
}

#[async_trait]
impl Block for Request {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let Some(raw_url) = node.non_empty("url") else {
            tracing::warn!(node = %node.id, "request without url");
            return Outcome::none();
        };
        let url = interpolate_in(&raw_url, ctx);

        let method_name = node
            .non_empty("method")
            .unwrap_or_else(|| "GET".into())
            .to_uppercase();
        let method = match Method::from_bytes(method_name.as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                return failure(ctx, "invalid_request", format!("Unknown HTTP method: {}", method_name))
            }
        };

        let mut headers: Vec<(String, String)> = node
            .pairs("headers")
            .into_iter()
            .map(|(key, value)| {
                let value = interpolate_in(&value, ctx);
                (key, value)
            })
            .collect();

        let params = node.pairs("bodyParams");
        let body = if method != Method::GET && method != Method::HEAD && !params.is_empty() {
            let mut body = Map::new();
            for (key, value) in params {
                body.insert(key, Value::String(interpolate_in(&value, ctx)));
            }
            let has_content_type = headers
                .iter()
                .any(|(key, _)| key.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                headers.push(("Content-Type".into(), "application/json".into()));
            }
            Some(Value::Object(body))
        } else {
            None
        };

        tracing::debug!(node = %node.id, method = %method, url = %url, "outbound request");
        match self.send(method, &url, headers, body).await {
            Ok(result) => {
                if let Some(error) = status_error(&url, &result) {
                    tracing::error!(node = %node.id, "{}", error);
                    ctx.record_error(error);
                }
                Outcome::output(result)
            }
            Err(e) => failure(ctx, "transport_error", e.to_string()),
        }
    }
}
