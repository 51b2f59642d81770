//! Shared runner contract (spec.md §4.4): one `Artifact` per phase, one
//! read-only view of the case each runner is handed, and a single trait the
//! orchestrator's dispatch table is keyed on.

use async_trait::async_trait;

use casegen_case_store::{
    CaseId, CostEstimate, EffortEstimate, FinancialSummary, Phase, PrdDraft, RelevantLink,
    SystemDesign, ValueProjection,
};

use crate::error::AgentError;

/// Read-only slice of a `Case` handed to a runner. A snapshot, not a live
/// reference, so a runner can never reach back into the store (spec.md §4.4
/// "Runners are stateless").
#[derive(Debug, Clone)]
pub struct CaseSnapshot {
    pub case_id: CaseId,
    pub title: String,
    pub problem_statement: String,
    pub relevant_links: Vec<RelevantLink>,
    pub prd_draft: Option<PrdDraft>,
    pub system_design: Option<SystemDesign>,
    pub effort_estimate: Option<EffortEstimate>,
    pub cost_estimate: Option<CostEstimate>,
    pub value_projection: Option<ValueProjection>,
}

impl CaseSnapshot {
    pub fn from_case(case: &casegen_case_store::Case) -> Self {
        Self {
            case_id: case.case_id,
            title: case.title.clone(),
            problem_statement: case.problem_statement.clone(),
            relevant_links: case.relevant_links.clone(),
            prd_draft: case.prd_draft.clone(),
            system_design: case.system_design.clone(),
            effort_estimate: case.effort_estimate.clone(),
            cost_estimate: case.cost_estimate.clone(),
            value_projection: case.value_projection.clone(),
        }
    }
}

/// The typed output of a single agent run, wrapped so the orchestrator can
/// hold a homogeneous `Vec`/`Result` across the six phases without knowing
/// each artifact's concrete shape.
#[derive(Debug, Clone)]
pub enum Artifact {
    Prd(PrdDraft),
    SystemDesign(SystemDesign),
    Effort(EffortEstimate),
    Cost(CostEstimate),
    Value(ValueProjection),
    Financial(FinancialSummary),
}

impl Artifact {
    pub fn phase(&self) -> Phase {
        match self {
            Artifact::Prd(_) => Phase::Prd,
            Artifact::SystemDesign(_) => Phase::SystemDesign,
            Artifact::Effort(_) => Phase::Effort,
            Artifact::Cost(_) => Phase::Cost,
            Artifact::Value(_) => Phase::Value,
            Artifact::Financial(_) => Phase::Financial,
        }
    }

    /// Re-validated whenever a human edits an artifact directly (spec.md §6
    /// `PUT /cases/{case_id}/prd` and its per-phase analogues), not just when
    /// an agent generates it.
    pub fn validate(&self) -> Result<(), casegen_case_store::ValidationError> {
        match self {
            Artifact::Prd(d) => d.validate(),
            Artifact::SystemDesign(d) => d.validate(),
            Artifact::Effort(d) => d.validate(),
            Artifact::Cost(d) => d.validate(),
            Artifact::Value(d) => d.validate(),
            Artifact::Financial(d) => d.validate(),
        }
    }
}

/// Implemented once per specialist (spec.md §4.4's six agents). The
/// orchestrator's dispatch table is `Phase -> Arc<dyn AgentRunner>`.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    fn phase(&self) -> Phase;

    async fn run(&self, snapshot: &CaseSnapshot) -> Result<Artifact, AgentError>;
}
