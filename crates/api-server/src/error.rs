//! Maps domain errors to HTTP responses.

use adgenius_core::AdGeniusError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error type returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub AdGeniusError);

impl From<AdGeniusError> for ApiError {
    fn from(err: AdGeniusError) -> Self {
        Self(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn status_for(err: &AdGeniusError) -> StatusCode {
    match err {
        AdGeniusError::UsageLimitExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
        AdGeniusError::TenantNotFound(_)
        | AdGeniusError::SubscriptionNotFound(_)
        | AdGeniusError::CampaignNotFound(_)
        | AdGeniusError::CreativeNotFound(_) => StatusCode::NOT_FOUND,
        AdGeniusError::InvalidPlan(_) | AdGeniusError::Validation(_) => StatusCode::BAD_REQUEST,
        AdGeniusError::Conflict(_) => StatusCode::CONFLICT,
        AdGeniusError::AIEngineError { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(&err);
        metrics::counter!("api.errors", "code" => err.code()).increment(1);

        let (message, details) = match &err {
            AdGeniusError::UsageLimitExceeded {
                resource,
                limit,
                used,
                requested,
            } => (
                format!("Plan limit reached for {resource}. Upgrade your plan to continue."),
                Some(serde_json::json!({
                    "resource": resource,
                    "limit": limit,
                    "used": used,
                    "requested": requested,
                })),
            ),
            e if e.is_user_facing() => (e.to_string(), None),
            AdGeniusError::AIEngineError { .. } => {
                warn!(error = %err, "Generation engine failure");
                ("Creative generation failed, try again later".to_string(), None)
            }
            _ => {
                error!(error = ?err, "Request failed");
                ("Internal processing error".to_string(), None)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: err.code().to_string(),
                message,
                details,
            }),
        )
            .into_response()
    }
}
