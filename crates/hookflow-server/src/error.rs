use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hookflow_core::{HookflowError, ProviderError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Flow finished without sending a response")]
    NoResponse(Option<ProviderError>),

    #[error("Flow did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Flow(#[from] HookflowError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, String, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found".into(), msg.clone()),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request".into(), msg.clone())
            }
            ApiError::NoResponse(Some(error)) => (
                StatusCode::BAD_GATEWAY,
                error.code.clone().unwrap_or_else(|| error.kind.clone()),
                error.message.clone(),
            ),
            ApiError::NoResponse(None) => (
                StatusCode::BAD_GATEWAY,
                "no_response".into(),
                self.to_string(),
            ),
            ApiError::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout".into(),
                self.to_string(),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".into(),
                msg.clone(),
            ),
            ApiError::Flow(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "flow_error".into(),
                e.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code = %code, "{}", message);
        }

        let body = Json(json!({
            "success": false,
            "status": status.as_u16(),
            "error": {
                "code": code,
                "message": message,
            },
            "metadata": {
                "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            },
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
