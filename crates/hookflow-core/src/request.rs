use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

/// The incoming request a flow runs for.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Value,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RequestInfo {
            method: method.into().to_uppercase(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "method": self.method,
            "path": self.path,
            "headers": self.headers,
            "query": self.query,
            "body": self.body,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentResponse {
    pub status: u16,
    pub body: ResponseBody,
}

/// Where terminal blocks write the HTTP response.
///
/// A sink accepts one terminal write; later writes are refused and report
/// `false`.
pub trait ResponseSink: Send {
    fn is_sent(&self) -> bool;

    fn send_json(&mut self, status: u16, body: Value) -> bool;

    fn send_text(&mut self, status: u16, body: String) -> bool;
}

/// In-memory sink that keeps the first terminal write.
#[derive(Debug, Default, Clone)]
pub struct BufferedResponse {
    sent: Option<SentResponse>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response(&self) -> Option<&SentResponse> {
        self.sent.as_ref()
    }

    pub fn into_response(self) -> Option<SentResponse> {
        self.sent
    }

    fn write(&mut self, status: u16, body: ResponseBody) -> bool {
        if self.sent.is_some() {
            tracing::warn!(status, "response already sent, dropping second write");
            return false;
        }
        self.sent = Some(SentResponse { status, body });
        true
    }
}

impl ResponseSink for BufferedResponse {
    fn is_sent(&self) -> bool {
        self.sent.is_some()
    }

    fn send_json(&mut self, status: u16, body: Value) -> bool {
        self.write(status, ResponseBody::Json(body))
    }

    fn send_text(&mut self, status: u16, body: String) -> bool {
        self.write(status, ResponseBody::Text(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_response_keeps_first_write() {
        let mut res = BufferedResponse::new();
        assert!(!res.is_sent());
        assert!(res.send_json(201, json!({"ok": true})));
        assert!(!res.send_text(500, "late".into()));
        let sent = res.into_response().unwrap();
        assert_eq!(sent.status, 201);
        assert_eq!(sent.body, ResponseBody::Json(json!({"ok": true})));
    }

    #[test]
    fn test_request_json_shape() {
        let req = RequestInfo::new("post", "/api/x")
            .with_query("a", "1")
            .with_header("X-Trace", "abc")
            .with_body(json!({"k": "v"}));
        let value = req.to_json();
        assert_eq!(value["method"], json!("POST"));
        assert_eq!(value["query"]["a"], json!("1"));
        assert_eq!(value["headers"]["x-trace"], json!("abc"));
        assert_eq!(value["body"]["k"], json!("v"));
    }
}
