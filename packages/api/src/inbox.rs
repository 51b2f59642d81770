//! Maps a reviewer's role to the pending-review statuses their inbox should
//! surface (spec.md §6 `GET /cases`: "lists cases visible to the caller
//! (owned or, if reviewer role, those in the matching pending-review
//! status)"), mirroring the role x phase table in spec.md §4.2.

use casegen_case_store::{Role, Status};

pub fn pending_review_statuses_for_role(role: Role) -> Vec<Status> {
    match role {
        Role::Admin => vec![
            Status::PrdReview,
            Status::SystemDesignPendingReview,
            Status::EffortPendingReview,
            Status::CostingPendingReview,
            Status::ValuePendingReview,
            Status::FinancialModelPendingReview,
            Status::PendingFinalApproval,
        ],
        Role::Developer | Role::TechnicalArchitect => {
            vec![Status::SystemDesignPendingReview, Status::EffortPendingReview]
        }
        Role::FinanceApprover => vec![Status::CostingPendingReview, Status::FinancialModelPendingReview],
        Role::SalesManagerApprover => vec![Status::ValuePendingReview],
        Role::FinalApprover => vec![Status::PendingFinalApproval],
        // Neither role alone implies a reviewer inbox; these actors only see
        // cases they own (spec.md §6).
        Role::CaseInitiator => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_sees_every_pending_review_status() {
        let statuses = pending_review_statuses_for_role(Role::Admin);
        assert!(statuses.contains(&Status::PrdReview));
        assert!(statuses.contains(&Status::PendingFinalApproval));
    }

    #[test]
    fn case_initiator_role_has_no_reviewer_inbox() {
        assert!(pending_review_statuses_for_role(Role::CaseInitiator).is_empty());
    }
}
