use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// `{error, message}` body sent for every failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Error returned by handlers; the status and label come from the error taxonomy.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Malformed query string or JSON body.
    pub fn rejected(rejection: impl fmt::Display) -> Self {
        Self(Error::BadRequest(rejection.to_string()))
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        let body = ErrorBody {
            error: self.0.label(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
