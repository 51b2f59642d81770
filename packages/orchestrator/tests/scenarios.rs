//! End-to-end scenarios S1-S6 from spec.md §8, driven through the public
//! `Orchestrator` API against `MemoryCaseStore` + `StubLlmBackend` exactly as
//! a request handler would drive it.

mod common;

use std::time::Duration;

use casegen_case_store::{Phase, Role, Status};
use casegen_orchestrator::OrchestratorError;

const PATIENCE: Duration = Duration::from_secs(2);

/// S1 - Happy path: a case walks every phase to `APPROVED`, reproducing the
/// literal Patient Portal Refresh numbers (Effort 120h/3 roles, Cost
/// $18,000, Value Low/Base/High $50k/$120k/$250k, Financial net $102,000 at
/// ROI 566.67%), with a final history length of at least 14.
#[tokio::test]
async fn s1_happy_path_reaches_approved_with_expected_numbers() {
    let h = common::build();
    common::seed_happy_path_responses(&h.llm);

    let initiator = common::actor("alice", Role::CaseInitiator);
    let case = h
        .orchestrator
        .clone()
        .initiate_case(initiator.clone(), "Patient Portal Refresh".into(), "Modernize the DrFirst patient portal".into(), vec![])
        .await
        .unwrap();
    let case_id = case.case_id;
    assert_eq!(case.status, Status::PrdDrafting);

    let case = common::run_phase_to_review(&h.orchestrator, case_id, Phase::Prd, &initiator).await;
    assert_eq!(case.status, Status::PrdReview);
    assert!(case.prd_draft.is_some());

    let case = h.orchestrator.clone().approve(initiator.clone(), case_id, Phase::Prd).await.unwrap();
    assert_eq!(case.status, Status::SystemDesignDrafting);

    let case = common::run_phase_to_review(&h.orchestrator, case_id, Phase::SystemDesign, &initiator).await;
    assert_eq!(case.status, Status::SystemDesignPendingReview);
    assert!(case.system_design.is_some());

    let architect = common::actor("bob", Role::TechnicalArchitect);
    let case = h.orchestrator.clone().approve(architect, case_id, Phase::SystemDesign).await.unwrap();
    assert_eq!(case.status, Status::PlanningInProgress);

    let case = common::run_phase_to_review(&h.orchestrator, case_id, Phase::Effort, &initiator).await;
    assert_eq!(case.status, Status::EffortPendingReview);
    let effort = case.effort_estimate.as_ref().unwrap();
    assert_eq!(effort.total_hours, 120);
    assert_eq!(effort.roles.len(), 3);

    let case = h.orchestrator.clone().approve(initiator.clone(), case_id, Phase::Effort).await.unwrap();
    assert_eq!(case.status, Status::CostingInProgress);

    let case = common::run_phase_to_review(&h.orchestrator, case_id, Phase::Cost, &initiator).await;
    assert_eq!(case.status, Status::CostingPendingReview);
    let cost = case.cost_estimate.as_ref().unwrap();
    assert_eq!(cost.estimated_cost.0, 1_800_000);

    let finance = common::actor("carol", Role::FinanceApprover);
    let case = h.orchestrator.clone().approve(finance.clone(), case_id, Phase::Cost).await.unwrap();
    assert_eq!(case.status, Status::ValueAnalysisInProgress);

    let case = common::run_phase_to_review(&h.orchestrator, case_id, Phase::Value, &initiator).await;
    assert_eq!(case.status, Status::ValuePendingReview);
    let value = case.value_projection.as_ref().unwrap();
    assert_eq!(value.scenarios.len(), 3);

    let sales = common::actor("dave", Role::SalesManagerApprover);
    let case = h.orchestrator.clone().approve(sales, case_id, Phase::Value).await.unwrap();
    assert_eq!(case.status, Status::FinancialModelInProgress);

    let case = common::run_phase_to_review(&h.orchestrator, case_id, Phase::Financial, &initiator).await;
    assert_eq!(case.status, Status::FinancialModelPendingReview);
    let financial = case.financial_summary.as_ref().unwrap();
    assert_eq!(financial.net_value_base.0, 10_200_000);
    assert!((financial.roi_percentage_base.unwrap() - 566.666_666_66).abs() < 0.01);

    let case = h.orchestrator.clone().approve(finance, case_id, Phase::Financial).await.unwrap();
    assert_eq!(case.status, Status::FinancialModelApproved);

    let case = h.orchestrator.clone().submit_final(initiator, case_id).await.unwrap();
    assert_eq!(case.status, Status::PendingFinalApproval);

    let final_approver = common::actor("erin", Role::FinalApprover);
    let case = h.orchestrator.clone().approve_final(final_approver, case_id).await.unwrap();
    assert_eq!(case.status, Status::Approved);
    assert!(case.history.len() >= 14, "history length was {}", case.history.len());
}

/// S2 - PRD rejection and edit: reject with a reason, edit while rejected,
/// resubmit, approve; no downstream artifacts exist yet so nothing is
/// staled.
#[tokio::test]
async fn s2_prd_rejection_then_edit_then_approval() {
    let h = common::build();
    common::seed_happy_path_responses(&h.llm);

    let initiator = common::actor("alice", Role::CaseInitiator);
    let case = h
        .orchestrator
        .clone()
        .initiate_case(initiator.clone(), "Patient Portal Refresh".into(), "Modernize the DrFirst patient portal".into(), vec![])
        .await
        .unwrap();
    let case_id = case.case_id;

    common::wait_for(&h.orchestrator, case_id, PATIENCE, |c| c.status == Status::PrdReview).await;

    // PRD review eligibility is owner-only (spec.md §4.2: the case
    // initiator reviews their own PRD before it feeds the rest of the
    // pipeline), so the rejection has to come from the initiator, not a
    // downstream reviewer.
    let case = h
        .orchestrator
        .clone()
        .reject(initiator.clone(), case_id, Phase::Prd, Some("Add HIPAA section".into()))
        .await
        .unwrap();
    assert_eq!(case.status, Status::PrdRejected);

    let edited = casegen_agents::Artifact::Prd(casegen_case_store::PrdDraft {
        title: "Patient Portal Refresh".into(),
        content_markdown: "# PRD\nModernize the DrFirst patient portal.\n## HIPAA\nCovered.".into(),
        version_label: "v2".into(),
    });
    let case = h.orchestrator.clone().edit_artifact(initiator.clone(), case_id, edited).await.unwrap();
    assert_eq!(case.status, Status::PrdRejected);
    assert!(!case.is_stale());

    let case = h.orchestrator.clone().submit_for_review(initiator.clone(), case_id, Phase::Prd).await.unwrap();
    assert_eq!(case.status, Status::PrdReview);

    let case = h.orchestrator.clone().approve(initiator, case_id, Phase::Prd).await.unwrap();
    assert_eq!(case.status, Status::SystemDesignDrafting);
    assert!(!case.is_stale());
}

/// S3 - Unauthorized approval: a `SALES_MANAGER_APPROVER` cannot approve a
/// cost estimate; case version and status are untouched.
#[tokio::test]
async fn s3_unauthorized_approval_is_rejected() {
    let h = common::build();
    common::seed_happy_path_responses(&h.llm);

    let initiator = common::actor("alice", Role::CaseInitiator);
    let case = h
        .orchestrator
        .clone()
        .initiate_case(initiator.clone(), "Patient Portal Refresh".into(), "Modernize the DrFirst patient portal".into(), vec![])
        .await
        .unwrap();
    let case_id = case.case_id;

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::Prd, &initiator).await;
    h.orchestrator.clone().approve(initiator.clone(), case_id, Phase::Prd).await.unwrap();

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::SystemDesign, &initiator).await;
    h.orchestrator
        .clone()
        .approve(common::actor("bob", Role::TechnicalArchitect), case_id, Phase::SystemDesign)
        .await
        .unwrap();

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::Effort, &initiator).await;
    h.orchestrator.clone().approve(initiator.clone(), case_id, Phase::Effort).await.unwrap();

    let before = common::run_phase_to_review(&h.orchestrator, case_id, Phase::Cost, &initiator).await;
    assert_eq!(before.status, Status::CostingPendingReview);

    let sales = common::actor("dave", Role::SalesManagerApprover);
    let err = h.orchestrator.clone().approve(sales, case_id, Phase::Cost).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::AuthorizationError));

    let after = h.orchestrator.get_case(case_id).unwrap();
    assert_eq!(after.status, Status::CostingPendingReview);
    assert_eq!(after.version, before.version);
}

/// S4 - LLM failure then retrigger: the PRD runner fails on a backend that
/// is configured unavailable (standing in for a call that never returns
/// inside `generation_timeout_ms`); with no retries configured the case goes
/// straight to `PRD_REJECTED` tagged as a system event, then `ADMIN`
/// retriggers and a healthy backend completes normally.
#[tokio::test]
async fn s4_llm_failure_then_admin_retrigger() {
    let h = common::build();
    h.llm.set_unavailable("product_manager", "draft_prd");

    let initiator = common::actor("alice", Role::CaseInitiator);
    let case = h
        .orchestrator
        .clone()
        .initiate_case(initiator, "Patient Portal Refresh".into(), "Modernize the DrFirst patient portal".into(), vec![])
        .await
        .unwrap();
    let case_id = case.case_id;

    let case = common::wait_for(&h.orchestrator, case_id, PATIENCE, |c| c.status == Status::PrdRejected).await;
    let failure_entry = case.history.iter().rev().find(|e| e.event_kind == "GenerationFailed").unwrap();
    assert_eq!(failure_entry.source, casegen_case_store::Source::System);
    assert!(case.prd_draft.is_none());

    h.llm.clear_failure("product_manager", "draft_prd");
    h.llm.set_response("product_manager", "draft_prd", "# PRD\nModernize the DrFirst patient portal.");

    let admin = common::actor("zoe", Role::Admin);
    let case = h.orchestrator.clone().trigger_generation(admin, case_id, Phase::Prd).await.unwrap();
    assert_eq!(case.status, Status::PrdDrafting);

    let case = common::wait_for(&h.orchestrator, case_id, PATIENCE, |c| c.status == Status::PrdReview).await;
    assert!(case.prd_draft.is_some());
}

/// S5 - Concurrency conflict: several concurrent `Approve(PRD)` calls on the
/// same case. `decide` only allows the transition once, so exactly one call
/// commits and every other call fails (either with a `ConflictError` if its
/// retries are exhausted against a still-racing writer, or an
/// `IllegalStateError` once it retries against the now-different status);
/// either way at most one PRD approval is ever recorded.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s5_concurrent_approvals_commit_exactly_once() {
    let h = common::build();
    common::seed_happy_path_responses(&h.llm);

    let initiator = common::actor("alice", Role::CaseInitiator);
    let case = h
        .orchestrator
        .clone()
        .initiate_case(initiator, "Patient Portal Refresh".into(), "Modernize the DrFirst patient portal".into(), vec![])
        .await
        .unwrap();
    let case_id = case.case_id;
    common::wait_for(&h.orchestrator, case_id, PATIENCE, |c| c.status == Status::PrdReview).await;

    let mut handles = Vec::new();
    for n in 0..8 {
        let orchestrator = h.orchestrator.clone();
        let caller = common::actor(&format!("approver-{n}"), Role::Admin);
        handles.push(tokio::spawn(async move { orchestrator.approve(caller, case_id, Phase::Prd).await }));
    }

    let mut ok_count = 0;
    let mut err_count = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok_count += 1,
            Err(OrchestratorError::ConflictError(_)) | Err(OrchestratorError::IllegalStateError(_)) => err_count += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(ok_count, 1, "exactly one concurrent approval should win");
    assert_eq!(err_count, 7);

    let case = h.orchestrator.get_case(case_id).unwrap();
    let approvals = case.history.iter().filter(|e| e.event_kind == "Approve" && e.to_status == Status::PrdApproved).count();
    assert_eq!(approvals, 1);
}

/// S6 - Policy change mid-flight: a case reaches `PENDING_FINAL_APPROVAL`,
/// then an admin repoints `final_approver_role_name` away from
/// `FINAL_APPROVER`; a caller who still only holds the old role is now
/// unauthorized.
#[tokio::test]
async fn s6_policy_change_revokes_final_approval_eligibility() {
    let h = common::build();
    common::seed_happy_path_responses(&h.llm);

    let initiator = common::actor("alice", Role::CaseInitiator);
    let case = h
        .orchestrator
        .clone()
        .initiate_case(initiator.clone(), "Patient Portal Refresh".into(), "Modernize the DrFirst patient portal".into(), vec![])
        .await
        .unwrap();
    let case_id = case.case_id;

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::Prd, &initiator).await;
    h.orchestrator.clone().approve(initiator.clone(), case_id, Phase::Prd).await.unwrap();

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::SystemDesign, &initiator).await;
    h.orchestrator
        .clone()
        .approve(common::actor("bob", Role::TechnicalArchitect), case_id, Phase::SystemDesign)
        .await
        .unwrap();

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::Effort, &initiator).await;
    h.orchestrator.clone().approve(initiator.clone(), case_id, Phase::Effort).await.unwrap();

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::Cost, &initiator).await;
    let finance = common::actor("carol", Role::FinanceApprover);
    h.orchestrator.clone().approve(finance.clone(), case_id, Phase::Cost).await.unwrap();

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::Value, &initiator).await;
    h.orchestrator
        .clone()
        .approve(common::actor("dave", Role::SalesManagerApprover), case_id, Phase::Value)
        .await
        .unwrap();

    common::run_phase_to_review(&h.orchestrator, case_id, Phase::Financial, &initiator).await;
    h.orchestrator.clone().approve(finance, case_id, Phase::Financial).await.unwrap();
    h.orchestrator.clone().submit_final(initiator, case_id).await.unwrap();

    let case = h.orchestrator.get_case(case_id).unwrap();
    assert_eq!(case.status, Status::PendingFinalApproval);

    h.policy.set_final_approver_role("ADMIN").unwrap();

    let final_approver = common::actor("erin", Role::FinalApprover);
    let err = h.orchestrator.clone().approve_final(final_approver, case_id).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::AuthorizationError));

    let admin = common::actor("zoe", Role::Admin);
    let case = h.orchestrator.clone().approve_final(admin, case_id).await.unwrap();
    assert_eq!(case.status, Status::Approved);
}
