use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use hookflow_core::{Flow, RequestInfo, ResponseBody, SentResponse};
use hookflow_eval::Executor;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::store::FlowStore;

pub struct AppState {
    pub executor: Executor,
    pub flows: Arc<dyn FlowStore>,
    pub request_timeout: Duration,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/:slug", any(run_flow))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// First label of the `Host` header, port stripped.
fn tenant(headers: &HeaderMap) -> ApiResult<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let name = host.split(':').next().unwrap_or_default();
    let label = name.split('.').next().unwrap_or_default().trim();
    if label.is_empty() {
        return Err(ApiError::BadRequest("missing Host header".into()));
    }
    let label = label.to_lowercase();
    if label == "www" {
        return Err(ApiError::BadRequest("no tenant in Host header".into()));
    }
    Ok(label)
}

/// Store lookups touch the filesystem, so they run on the blocking pool.
async fn fetch_flow(
    flows: Arc<dyn FlowStore>,
    tenant: String,
    slug: String,
) -> ApiResult<Option<Arc<Flow>>> {
    tokio::task::spawn_blocking(move || flows.fetch(&tenant, &slug))
        .await
        .map_err(|e| ApiError::Internal(format!("flow lookup failed: {}", e)))?
        .map_err(ApiError::from)
}

fn request_body(body: &Bytes) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn request_info(
    method: &Method,
    slug: &str,
    headers: &HeaderMap,
    query: BTreeMap<String, String>,
    body: &Bytes,
) -> RequestInfo {
    let mut request = RequestInfo::new(method.as_str(), format!("/api/{}", slug));
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    request.query = query;
    request.with_body(request_body(body))
}

fn into_http(response: SentResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match response.body {
        ResponseBody::Json(body) => (status, Json(body)).into_response(),
        ResponseBody::Text(text) => (status, text).into_response(),
    }
}

async fn run_flow(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResult<Response> {
    let tenant = tenant(&headers)?;
    let flow = fetch_flow(state.flows.clone(), tenant.clone(), slug.clone())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no flow '{}' for '{}'", slug, tenant)))?;

    let request = request_info(&method, &slug, &headers, query, &body);
    tracing::info!(tenant = %tenant, slug = %slug, method = %method, "running flow");

    let run = tokio::time::timeout(state.request_timeout, state.executor.execute(flow, &request))
        .await
        .map_err(|_| ApiError::Timeout(state.request_timeout))?;

    match run.response {
        Some(response) => Ok(into_http(response)),
        None => Err(ApiError::NoResponse(run.context.last_error)),
    }
}
