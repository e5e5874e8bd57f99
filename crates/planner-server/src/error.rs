use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use planner_core::error::{PlannerError, ProcessError};
use planner_core::failure_message;

// ---------------------------------------------------------------------------
// Internal sentinel for request bodies rejected before reaching the core
// ---------------------------------------------------------------------------

/// Carries an explicit status (413, 400) for malformed or oversized
/// multipart bodies through the `anyhow::Error` chain.
#[derive(Debug)]
struct RejectedBody {
    status: StatusCode,
    message: String,
}

impl std::fmt::Display for RejectedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RejectedBody {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Always answers `{"error": "..."}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn rejected_body(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(
            RejectedBody {
                status,
                message: msg.into(),
            }
            .into(),
        )
    }
}

fn planner_status(e: &PlannerError) -> StatusCode {
    match e {
        PlannerError::NotInitialized | PlannerError::Validation(_) => StatusCode::BAD_REQUEST,
        PlannerError::SolveInProgress(_) => StatusCode::CONFLICT,
        PlannerError::Process(ProcessError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        PlannerError::Process(_) => StatusCode::BAD_GATEWAY,
        PlannerError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PlannerError::Store(_) | PlannerError::Io(_) | PlannerError::Yaml(_) | PlannerError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(r) = self.0.downcast_ref::<RejectedBody>() {
            let body = serde_json::json!({ "error": r.message.clone() });
            return (r.status, axum::Json(body)).into_response();
        }

        let (status, message) = match self.0.downcast_ref::<PlannerError>() {
            Some(e) => (planner_status(e), failure_message(e)),
            None => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
        };
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
