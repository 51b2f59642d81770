use serde::{Deserialize, Serialize};

use casegen_case_store::{Phase, Role};

/// Reasons an agent run can fail (spec.md §4.4 failure taxonomy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PromptMissing,
    LlmUnavailable,
    LlmTimeout,
    ParseFailure,
    InvariantViolation,
    DependencyMissing,
}

impl FailureKind {
    /// Retryable kinds get the orchestrator's LLM backoff (spec.md §4.4);
    /// the rest are deterministic and fail straight to `*_REJECTED`.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::LlmUnavailable | FailureKind::LlmTimeout)
    }
}

/// External/internal events the state machine accepts (spec.md §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    InitiateCase,
    SubmitForReview(Phase),
    Approve(Phase),
    Reject(Phase, Option<String>),
    EditArtifact(Phase),
    TriggerGeneration(Phase),
    GenerationStarted(Phase),
    GenerationCompleted(Phase),
    GenerationFailed(Phase, FailureKind),
    SubmitFinal,
    ApproveFinal,
    RejectFinal(Option<String>),
}

/// The caller of an event, carrying just enough of `AuthContext` (spec.md §1)
/// for `can_act` to decide eligibility.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}
