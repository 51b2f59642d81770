use thiserror::Error;

use casegen_case_store::ValidationError;
use casegen_prompt_catalog::CatalogError;
use casegen_registry::RegistryError;

/// Failure taxonomy for a single agent run (spec.md §4.4).
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no active prompt for this agent function: {0}")]
    PromptMissing(String),

    #[error("llm backend unavailable: {0}")]
    LlmUnavailable(String),

    #[error("llm call timed out")]
    LlmTimeout,

    #[error("could not parse llm output into the expected artifact shape: {0}")]
    ParseFailure(String),

    #[error("generated artifact violates its invariants: {0}")]
    InvariantViolation(#[from] ValidationError),

    #[error("a required input was missing or unresolvable: {0}")]
    DependencyMissing(String),
}

impl AgentError {
    /// Retryable kinds get the orchestrator's LLM backoff (spec.md §4.4);
    /// the rest are deterministic and fail straight to `*_REJECTED`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::LlmUnavailable(_) | AgentError::LlmTimeout)
    }
}

impl From<CatalogError> for AgentError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::PromptMissing { agent_name, agent_function } => {
                AgentError::PromptMissing(format!("{agent_name}/{agent_function}"))
            }
            CatalogError::NotFound(id) => AgentError::PromptMissing(id),
            CatalogError::VersionNotFound(label) => AgentError::PromptMissing(label),
            CatalogError::NoActiveVersion(id) => AgentError::PromptMissing(id),
            CatalogError::MissingPlaceholder(key) => AgentError::DependencyMissing(key),
        }
    }
}

impl From<RegistryError> for AgentError {
    fn from(err: RegistryError) -> Self {
        AgentError::DependencyMissing(err.to_string())
    }
}
