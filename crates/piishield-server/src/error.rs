//! HTTP error type for the API routes

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use piishield_observability::Outcome;
use piishield_pii::DetectionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::InvalidRequest(_) => "invalid_request_error",
            ApiError::Timeout(_) => "timeout_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// Metrics label for a request that failed with this error
    pub fn outcome(&self) -> Outcome {
        match self {
            ApiError::PayloadTooLarge(_) | ApiError::InvalidRequest(_) => Outcome::ClientError,
            ApiError::Timeout(_) => Outcome::Timeout,
            ApiError::Internal(_) => Outcome::ServerError,
        }
    }
}

impl From<DetectionError> for ApiError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::SizeExceeded { .. } => ApiError::PayloadTooLarge(err.to_string()),
            DetectionError::InvalidConfiguration(_) | DetectionError::InvalidMatch(_) => {
                ApiError::InvalidRequest(err.to_string())
            }
            // Registry errors only happen at startup
            DetectionError::PatternCompilation { .. } | DetectionError::KeywordCompilation(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

/// Messages are fixed per rejection kind; serde's own text quotes input values
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge("request body exceeds the size limit".to_string());
        }
        let message = match rejection {
            JsonRejection::JsonSyntaxError(_) => "malformed JSON body".to_string(),
            JsonRejection::JsonDataError(_) => {
                "request body does not match the expected schema".to_string()
            }
            JsonRejection::MissingJsonContentType(_) => {
                "expected Content-Type: application/json".to_string()
            }
            other => format!("unreadable request body ({})", other.status()),
        };
        ApiError::InvalidRequest(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
                "code": status.as_u16(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
