use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::domain::TradeOpsError;

/// Result alias for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Wrapper turning the domain error taxonomy into HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub TradeOpsError);

impl From<TradeOpsError> for ApiError {
    fn from(err: TradeOpsError) -> Self {
        Self(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self(TradeOpsError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            TradeOpsError::Validation(_) | TradeOpsError::MalformedRecord(_) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            TradeOpsError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            TradeOpsError::BudgetExhausted { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "budget_exhausted")
            }
            TradeOpsError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
            TradeOpsError::UpstreamApi { .. }
            | TradeOpsError::TokenRefreshFailed { .. }
            | TradeOpsError::Http(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            TradeOpsError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = json!({
            "error": code,
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
