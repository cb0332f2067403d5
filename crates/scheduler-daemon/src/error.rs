use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use scheduler_core::SchedulerError;

/// HTTP-facing error type, following the reference daemon's `ApiError`
/// shape: a status code plus a message, converted from domain errors at
/// the edge rather than threading HTTP concerns into `scheduler-core`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::EmptyName
            | SchedulerError::EmptySubs(_)
            | SchedulerError::DuplicateSubs(_) => ApiError::bad_request(err.to_string()),
            SchedulerError::CheckpointCorrupt { .. } | SchedulerError::CheckpointWrite { .. } => {
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
