use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::flow::Flow;
use crate::request::RequestInfo;

/// Context-level names a template path may start with.
pub const NAMESPACES: &[&str] = &[
    "local", "params", "result", "variables", "flow", "endpoint", "req", "error",
];

/// Uniform shape of a failed call to an external provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderError {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: Option<String>,
    pub message: String,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(
        source: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ProviderError {
            source: source.into(),
            kind: kind.into(),
            code: None,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} {} ({}): {}", self.source, self.kind, status, self.message),
            None => write!(f, "{} {}: {}", self.source, self.kind, self.message),
        }
    }
}

/// A borrowed view of one context namespace.
#[derive(Debug, Clone, Copy)]
pub enum ScopeRef<'a> {
    Map(&'a Map<String, Value>),
    Value(&'a Value),
}

impl<'a> ScopeRef<'a> {
    pub fn to_value(self) -> Value {
        match self {
            ScopeRef::Map(map) => Value::Object(map.clone()),
            ScopeRef::Value(value) => value.clone(),
        }
    }
}

/// Per-request state threaded through one flow walk.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub variables: Map<String, Value>,
    pub local: Map<String, Value>,
    pub result: Map<String, Value>,
    pub params: Map<String, Value>,
    pub endpoint: Value,
    pub last_decision: Option<bool>,
    pub last_error: Option<ProviderError>,
    flow: Arc<Flow>,
    defaults: Map<String, Value>,
    request: Value,
    error: Value,
    initialized: bool,
}

impl ExecutionContext {
    pub fn new(flow: Arc<Flow>) -> Self {
        let defaults = flow.defaults();
        ExecutionContext {
            variables: Map::new(),
            local: Map::new(),
            result: Map::new(),
            params: Map::new(),
            endpoint: Value::Null,
            last_decision: None,
            last_error: None,
            flow,
            defaults,
            request: Value::Null,
            error: Value::Null,
            initialized: false,
        }
    }

    pub fn flow(&self) -> &Arc<Flow> {
        &self.flow
    }

    /// Declared query parameter defaults of the flow.
    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn request(&self) -> &Value {
        &self.request
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Derives `params` and seeds `variables` for this request.
    ///
    /// Runs once; later calls are no-ops so recursive re-entry keeps the
    /// values assigned so far.
    pub fn initialize(&mut self, request: &RequestInfo) {
        if self.initialized {
            return;
        }

        let mut params = self.defaults.clone();
        for (key, value) in &request.query {
            params.insert(key.clone(), Value::String(value.clone()));
        }

        self.request = request.to_json();
        self.endpoint = json!({
            "slug": self.flow.slug(),
            "queryParams": self.flow.query_params(),
        });

        for (key, value) in &params {
            self.variables.insert(key.clone(), value.clone());
        }
        self.variables
            .insert("params".into(), Value::Object(params.clone()));
        self.variables.insert("req".into(), self.request.clone());
        self.variables.insert("endpoint".into(), self.endpoint.clone());
        self.variables
            .insert("flow".into(), self.flow.to_json().clone());

        self.params = params;
        self.initialized = true;
    }

    /// Stores a named node result under both `local` and `result`.
    pub fn assign(&mut self, name: &str, value: Value) {
        self.local.insert(name.to_string(), value.clone());
        self.result.insert(name.to_string(), value);
    }

    /// Replaces the endpoint metadata and its `variables.endpoint` copy.
    pub fn set_endpoint(&mut self, endpoint: Value) {
        self.variables.insert("endpoint".into(), endpoint.clone());
        self.endpoint = endpoint;
    }

    pub fn set_local(&mut self, name: &str, value: Value) {
        self.local.insert(name.to_string(), value);
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn record_decision(&mut self, decision: bool) {
        self.last_decision = Some(decision);
    }

    pub fn record_error(&mut self, error: ProviderError) {
        self.error = error.to_json();
        self.last_error = Some(error);
    }

    /// Context-level namespace by name, see [`NAMESPACES`].
    pub fn namespace(&self, name: &str) -> Option<ScopeRef<'_>> {
        match name {
            "local" => Some(ScopeRef::Map(&self.local)),
            "params" => Some(ScopeRef::Map(&self.params)),
            "result" => Some(ScopeRef::Map(&self.result)),
            "variables" => Some(ScopeRef::Map(&self.variables)),
            "flow" => Some(ScopeRef::Value(self.flow.to_json())),
            "endpoint" => Some(ScopeRef::Value(&self.endpoint)),
            "req" => Some(ScopeRef::Value(&self.request)),
            "error" => Some(ScopeRef::Value(&self.error)),
            _ => None,
        }
    }

    /// Merged read view of the context, for diagnostics.
    pub fn snapshot(&self) -> Value {
        let mut view = self.variables.clone();
        view.insert("local".into(), Value::Object(self.local.clone()));
        view.insert("result".into(), Value::Object(self.result.clone()));
        view.insert("params".into(), Value::Object(self.params.clone()));
        view.insert("endpoint".into(), self.endpoint.clone());
        view.remove("flow");
        if let Some(decision) = self.last_decision {
            view.insert("lastDecision".into(), Value::Bool(decision));
        }
        if !self.error.is_null() {
            view.insert("error".into(), self.error.clone());
        }
        Value::Object(view)
    }
}
