//! HTTP error response mapping.

use crate::error::ThermoError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`ThermoError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(ThermoError);

impl From<ThermoError> for ApiError {
    fn from(err: ThermoError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ThermoError::validation_error(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ThermoError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ThermoError::Lifecycle(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            err => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
