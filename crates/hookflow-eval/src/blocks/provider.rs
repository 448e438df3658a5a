use hookflow_core::{ExecutionContext, ProviderError};
use serde_json::Value;

/// Reply of a provider endpoint: status plus the JSON body (`Null` when the
/// body is not JSON).
pub(super) struct ProviderReply {
    pub status: u16,
    pub ok: bool,
    pub body: Value,
}

pub(super) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    payload: &Value,
) -> Result<ProviderReply, reqwest::Error> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .await?;
    let status = response.status();
    let text = response.text().await?;
    Ok(ProviderReply {
        status: status.as_u16(),
        ok: status.is_success(),
        body: serde_json::from_str(&text).unwrap_or(Value::Null),
    })
}

pub(super) fn missing_credentials(source: &str, env: &str) -> ProviderError {
    ProviderError::new(
        source,
        "missing_credentials",
        format!("{} API key is not configured (set {})", source, env),
    )
}

pub(super) fn transport_error(source: &str, error: &reqwest::Error) -> ProviderError {
    let kind = if error.is_timeout() {
        "timeout"
    } else {
        "api_error"
    };
    ProviderError::new(source, kind, error.to_string())
        .with_status(error.status().map(|s| s.as_u16()))
}

/// Logs the failure and stores it as the context's last error. Returns the
/// message for the block's output.
pub(super) fn record_failure(ctx: &mut ExecutionContext, error: ProviderError) -> String {
    tracing::error!(
        source = %error.source,
        kind = %error.kind,
        status = ?error.status,
        code = ?error.code,
        "{}",
        error.message
    );
    let message = error.message.clone();
    ctx.record_error(error);
    message
}

/// Text of a JSON scalar, for error codes that may be numbers or strings.
pub(super) fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
