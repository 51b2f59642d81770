//! Reviewer eligibility (spec.md §4.2 "Reviewer eligibility (role × phase)").

use casegen_case_store::{Phase, Role};

use crate::events::{Actor, Event};

fn reviewer_role_allowed(phase: Phase, actor: &Actor, case_owner_id: &str) -> bool {
    match phase {
        Phase::Prd => actor.user_id == case_owner_id,
        Phase::SystemDesign => matches!(actor.role, Role::Developer | Role::TechnicalArchitect),
        Phase::Effort => {
            matches!(actor.role, Role::Developer | Role::TechnicalArchitect) || actor.user_id == case_owner_id
        }
        Phase::Cost => matches!(actor.role, Role::FinanceApprover),
        Phase::Value => matches!(actor.role, Role::SalesManagerApprover) || actor.user_id == case_owner_id,
        Phase::Financial => matches!(actor.role, Role::FinanceApprover),
    }
}

/// `can_act(event, actor_role, case_owner_id, actor_id) -> bool` from
/// spec.md §4.2. `final_approver_role` is threaded in from the policy config
/// (spec.md §4.7 / §8 property 8) since eligibility for final approval
/// depends on a live, mutable setting rather than a fixed table entry.
pub fn can_act(event: &Event, actor: &Actor, case_owner_id: &str, final_approver_role: Role) -> bool {
    // ADMIN is additively permitted for every review transition (spec.md
    // §4.2 tie-break rule).
    if actor.role == Role::Admin {
        if matches!(
            event,
            Event::EditArtifact(_) | Event::SubmitForReview(_) | Event::SubmitFinal
        ) {
            // These are initiator-scoped actions; ADMIN's blanket allowance
            // covers *review* transitions (approve/reject/final-approve),
            // not editing someone else's draft on their behalf.
        } else {
            return true;
        }
    }

    match event {
        Event::InitiateCase => true,

        Event::Approve(phase) | Event::Reject(phase, _) => reviewer_role_allowed(*phase, actor, case_owner_id),

        Event::EditArtifact(_) | Event::SubmitForReview(_) => actor.user_id == case_owner_id,

        Event::TriggerGeneration(_) => actor.role == Role::Admin,

        Event::SubmitFinal => actor.user_id == case_owner_id,

        Event::ApproveFinal | Event::RejectFinal(_) => actor.role == final_approver_role,

        // Agent-lifecycle events never traverse the authorized API; the
        // orchestrator raises them itself and never calls `can_act` for them.
        Event::GenerationStarted(_) | Event::GenerationCompleted(_) | Event::GenerationFailed(_, _) => true,
    }
}
