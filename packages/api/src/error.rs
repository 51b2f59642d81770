//! Single translation point from `OrchestratorError` to HTTP (spec.md §7
//! "Exceptions for control flow ... the HTTP boundary performs the single
//! translation to status codes").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use casegen_orchestrator::OrchestratorError;

pub enum ApiError {
    Orchestrator(OrchestratorError),
    BadRequest(String),
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError::Orchestrator(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    message: String,
    error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error_code, details) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, "BAD_REQUEST", None),
            ApiError::Orchestrator(err) => {
                let status = match &err {
                    OrchestratorError::AuthorizationError => StatusCode::FORBIDDEN,
                    OrchestratorError::IllegalStateError(_) => StatusCode::CONFLICT,
                    OrchestratorError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    OrchestratorError::ConflictError(_) => StatusCode::CONFLICT,
                    OrchestratorError::NotFoundError(_) => StatusCode::NOT_FOUND,
                    OrchestratorError::AgentError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    OrchestratorError::PolicyError(_) => StatusCode::BAD_REQUEST,
                    OrchestratorError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let error_code = err.error_code();
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    "an internal error occurred".to_string()
                } else {
                    err.to_string()
                };
                (status, message, error_code, None)
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(%error_code, "internal error surfaced to caller");
        }

        (status, Json(ErrorBody { error: ErrorPayload { message, error_code, details } })).into_response()
    }
}
