//! Maps [`dsearch_core::error::CoreError`] onto the HTTP status/body contract
//! in spec §7, the same way the teacher's `server/src/api.rs` handlers
//! return `(StatusCode, Json<serde_json::Value>)` on failure.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dsearch_core::error::CoreError;
use serde::Serialize;

/// Uniform envelope for every JSON response (spec §6: `{success, message?, data?}`).
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, message: None, data: Some(data) })
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self { success: true, message: Some(message.into()), data: Some(data) })
    }
}

/// Error envelope matching spec §6: `{success: false, message, error}`.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error: String,
}

/// Newtype so handlers can `?`-propagate `CoreError` straight into an axum
/// response without an orphan-rule conflict on `IntoResponse for CoreError`.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = status_and_message(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error");
        }
        let body = ErrorBody { success: false, message: message.clone(), error: message };
        let mut response = (status, Json(body)).into_response();
        if let CoreError::RateLimited { retry_after_secs } = &self.0 {
            if let Ok(val) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("retry-after", val);
            }
        }
        response
    }
}

fn status_and_message(err: &CoreError) -> (StatusCode, String) {
    let status = match err {
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::UnsupportedType(_) | CoreError::TooLarge { .. } | CoreError::ContentRejected(_) => {
            StatusCode::BAD_REQUEST
        }
        CoreError::EmbedderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::ChunkStoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    // Sanitized for the caller: no file paths, no internal detail beyond the
    // error's own display text (spec §7 "request errors ... sanitized message").
    let message = match status {
        StatusCode::INTERNAL_SERVER_ERROR => "internal server error".to_string(),
        _ => err.to_string(),
    };
    (status, message)
}
