use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use studytrack_core::CoreError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self.0 {
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CoreError::InvalidSessionData(_) => (StatusCode::BAD_REQUEST, "INVALID_SESSION_DATA"),
            CoreError::Invalid(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            CoreError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error = if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            "internal error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorBody { error, code })).into_response()
    }
}
