//! Maps domain errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use freshmart_core::FreshmartError;

/// Wire shape of every non-2xx response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// A domain error crossing the HTTP boundary. Handlers return this via `?`
/// and the `IntoResponse` impl picks the status code.
#[derive(Debug)]
pub struct ApiError(pub FreshmartError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<FreshmartError> for ApiError {
    fn from(err: FreshmartError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            FreshmartError::Validation(_) | FreshmartError::Checkout(_) => StatusCode::BAD_REQUEST,
            FreshmartError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FreshmartError::Forbidden(_) => StatusCode::FORBIDDEN,
            FreshmartError::NotFound(_) => StatusCode::NOT_FOUND,
            FreshmartError::Conflict(_) | FreshmartError::InsufficientStock(_) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code for the response body.
    fn code(&self) -> &'static str {
        match &self.0 {
            FreshmartError::Config(_) => "config_error",
            FreshmartError::NotFound(_) => "not_found",
            FreshmartError::Conflict(_) => "conflict",
            FreshmartError::Validation(_) => "validation_failed",
            FreshmartError::Unauthorized(_) => "unauthorized",
            FreshmartError::Forbidden(_) => "forbidden",
            FreshmartError::InsufficientStock(_) => "insufficient_stock",
            FreshmartError::Checkout(_) => "checkout_failed",
            FreshmartError::Recommendation(_) => "recommendation_failed",
            FreshmartError::Serialization(_) => "serialization_error",
            FreshmartError::Io(_) => "io_error",
            FreshmartError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        }
        metrics::counter!("api.errors", "code" => self.code()).increment(1);
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (FreshmartError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (FreshmartError::Checkout("x".into()), StatusCode::BAD_REQUEST),
            (FreshmartError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (FreshmartError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (FreshmartError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (FreshmartError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                FreshmartError::InsufficientStock("x".into()),
                StatusCode::CONFLICT,
            ),
            (
                FreshmartError::Recommendation("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[test]
    fn test_body_carries_domain_message() {
        let err = ApiError(FreshmartError::NotFound("product".into()));
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.0.to_string(), "Not found: product");
    }
}
