use thiserror::Error;

use casegen_agents::AgentError;
use casegen_case_store::{StoreError, ValidationError};
use casegen_policy_config::PolicyError;
use casegen_workflow::WorkflowError;

/// Error taxonomy surfaced by the orchestrator (spec.md §7). The API crate's
/// only job is to translate one of these into an HTTP status code and the
/// `{error:{message,error_code,details?}}` wire shape.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("caller is not authorized to perform this action")]
    AuthorizationError,

    #[error(transparent)]
    IllegalStateError(#[from] WorkflowError),

    #[error(transparent)]
    ValidationError(#[from] ValidationError),

    #[error("optimistic concurrency retries exhausted for case {0}")]
    ConflictError(String),

    #[error("case {0} not found")]
    NotFoundError(String),

    #[error(transparent)]
    AgentError(#[from] AgentError),

    #[error(transparent)]
    PolicyError(#[from] PolicyError),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl OrchestratorError {
    /// Stable machine-readable discriminant for the wire format's
    /// `error_code` field (spec.md §6).
    pub fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::AuthorizationError => "AUTHORIZATION_ERROR",
            OrchestratorError::IllegalStateError(_) => "ILLEGAL_STATE_ERROR",
            OrchestratorError::ValidationError(_) => "VALIDATION_ERROR",
            OrchestratorError::ConflictError(_) => "CONFLICT_ERROR",
            OrchestratorError::NotFoundError(_) => "NOT_FOUND_ERROR",
            OrchestratorError::AgentError(_) => "AGENT_ERROR",
            OrchestratorError::PolicyError(_) => "POLICY_ERROR",
            OrchestratorError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

pub(crate) fn map_store_err(err: StoreError) -> OrchestratorError {
    match err {
        StoreError::NotFound(id) => OrchestratorError::NotFoundError(id),
        StoreError::Conflict(id) => OrchestratorError::ConflictError(id),
        StoreError::ConcurrencyConflict { case_id, .. } => OrchestratorError::ConflictError(case_id),
    }
}
