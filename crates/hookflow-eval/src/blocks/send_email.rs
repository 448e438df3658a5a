use async_trait::async_trait;
use hookflow_core::{
    ExecutionContext, Node, Outcome, ProviderError, RequestInfo, ResendConfig, ResponseSink,
};
use serde_json::{json, Value};

use super::provider::{missing_credentials, post_json, record_failure, scalar_text, transport_error};
use super::Block;
use crate::interpolate::interpolate_in;

const SOURCE: &str = "resend";

/// Email dispatch over the Resend API; `body` is sent as HTML.
pub struct SendEmail {
    client: reqwest::Client,
    config: ResendConfig,
}

struct Email {
    to: String,
    from: String,
    subject: String,
    body: String,
}

impl SendEmail {
    pub fn new(client: reqwest::Client, config: ResendConfig) -> Self {
        SendEmail { client, config }
    }

    async fn deliver(&self, email: &Email) -> Result<Value, ProviderError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| missing_credentials(SOURCE, &self.config.api_key_env))?;

        let url = format!("{}/emails", self.config.base_url.trim_end_matches('/'));
        let payload = json!({
            "to": email.to,
            "from": email.from,
            "subject": email.subject,
            "html": email.body,
        });

        let reply = post_json(&self.client, &url, &api_key, &payload)
            .await
            .map_err(|e| transport_error(SOURCE, &e))?;
        if !reply.ok {
            return Err(api_error(&reply.body, reply.status));
        }

        Ok(json!({
            "id": reply.body.get("id").cloned().unwrap_or(Value::Null),
            "to": email.to,
            "subject": email.subject,
            "status": "sent",
        }))
    }
}

fn api_error(body: &Value, status: u16) -> ProviderError {
    let kind = body.get("name").and_then(Value::as_str).unwrap_or("api_error");
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown Resend error");
    ProviderError::new(SOURCE, kind, message)
        .with_code(scalar_text(body.get("code").or_else(|| body.get("statusCode"))))
        .with_status(Some(status))
}

#[async_trait]
impl Block for SendEmail {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let email = Email {
            to: interpolate_in(&node.text("to"), ctx),
            from: interpolate_in(&node.text("from"), ctx),
            subject: interpolate_in(&node.text("subject"), ctx),
            body: interpolate_in(&node.text("body"), ctx),
        };
        if [&email.to, &email.from, &email.subject, &email.body]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            tracing::warn!(node = %node.id, "sendEmail needs to, from, subject and body");
            return Outcome::none();
        }

        tracing::debug!(node = %node.id, to = %email.to, "sending email");
        match self.deliver(&email).await {
            Ok(result) => Outcome::output(result),
            Err(error) => Outcome::output(Value::String(record_failure(ctx, error))).stop(),
        }
    }
}
