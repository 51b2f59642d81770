//! axum handlers for the event/command surface in spec.md §6.
//!
//! One route group per phase (`/cases/:case_id/:phase_slug/...`), composed
//! the way the teacher's `gate`/`arbiter` binaries compose theirs: a shared
//! `Arc<AppState>`, `TraceLayer` for request logging, thin handlers that
//! translate a request straight into one `Orchestrator` call.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use casegen_case_store::{
    Case, CaseId, CostEstimate, EffortEstimate, FinancialSummary, PrdDraft, StatusFilter,
    SystemDesign, ValueProjection,
};
use casegen_orchestrator::Orchestrator;
use casegen_workflow::Actor;

use crate::auth::AuthContext;
use crate::dto::{CreateCaseRequest, CreateCaseResponse, ReasonBody};
use crate::error::ApiError;
use crate::inbox::pending_review_statuses_for_role;
use crate::phase_slug::phase_from_slug;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = Arc::new(AppState { orchestrator });

    Router::new()
        .route("/cases", post(create_case).get(list_cases))
        .route("/cases/:case_id", get(get_case))
        .route("/cases/:case_id/prd", put(put_prd))
        .route("/cases/:case_id/system-design", put(put_system_design))
        .route("/cases/:case_id/effort", put(put_effort))
        .route("/cases/:case_id/cost", put(put_cost))
        .route("/cases/:case_id/value", put(put_value))
        .route("/cases/:case_id/financial", put(put_financial))
        .route("/cases/:case_id/:phase/submit", post(submit_phase))
        .route("/cases/:case_id/:phase/approve", post(approve_phase))
        .route("/cases/:case_id/:phase/reject", post(reject_phase))
        .route("/cases/:case_id/trigger/:phase", post(trigger_phase))
        .route("/cases/:case_id/submit-final", post(submit_final))
        .route("/cases/:case_id/approve-final", post(approve_final))
        .route("/cases/:case_id/reject-final", post(reject_final))
        .with_state(state)
}

fn parse_case_id(raw: &str) -> Result<CaseId, ApiError> {
    Uuid::parse_str(raw)
        .map(CaseId)
        .map_err(|_| ApiError::BadRequest(format!("'{raw}' is not a valid case id")))
}

fn actor_of(ctx: AuthContext) -> Actor {
    ctx.0
}

// ---- case lifecycle ----

async fn create_case(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(body): Json<CreateCaseRequest>,
) -> Result<Json<CreateCaseResponse>, ApiError> {
    let links = body.relevant_links.into_iter().map(Into::into).collect();
    let case = state
        .orchestrator
        .clone()
        .initiate_case(actor_of(ctx), body.title, body.problem_statement, links)
        .await?;
    Ok(Json(CreateCaseResponse { case_id: case.case_id, initial_status: case.status }))
}

/// spec.md §6 "lists cases visible to the caller (owned or, if reviewer
/// role, those in the matching pending-review status)".
async fn list_cases(State(state): State<Arc<AppState>>, ctx: AuthContext) -> Json<Vec<Case>> {
    let actor = actor_of(ctx);
    let mut cases = state.orchestrator.list_owned(&actor.user_id, &StatusFilter::any());

    let reviewable_statuses = pending_review_statuses_for_role(actor.role);
    if !reviewable_statuses.is_empty() {
        let filter = StatusFilter { statuses: Some(reviewable_statuses) };
        for case in state.orchestrator.list_for_role(actor.role, &filter) {
            if !cases.iter().any(|c| c.case_id == case.case_id) {
                cases.push(case);
            }
        }
    }

    Json(cases)
}

async fn get_case(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<String>,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&case_id)?;
    Ok(Json(state.orchestrator.get_case(case_id)?))
}

// ---- per-phase artifact edits (spec.md §6 `PUT /cases/{case_id}/prd` and analogues) ----

macro_rules! put_artifact_handler {
    ($name:ident, $artifact_ty:ty, $variant:ident) => {
        async fn $name(
            State(state): State<Arc<AppState>>,
            Path(case_id): Path<String>,
            ctx: AuthContext,
            Json(body): Json<$artifact_ty>,
        ) -> Result<Json<Case>, ApiError> {
            let case_id = parse_case_id(&case_id)?;
            let artifact = casegen_agents::Artifact::$variant(body);
            let case = state.orchestrator.clone().edit_artifact(actor_of(ctx), case_id, artifact).await?;
            Ok(Json(case))
        }
    };
}

put_artifact_handler!(put_prd, PrdDraft, Prd);
put_artifact_handler!(put_system_design, SystemDesign, SystemDesign);
put_artifact_handler!(put_effort, EffortEstimate, Effort);
put_artifact_handler!(put_cost, CostEstimate, Cost);
put_artifact_handler!(put_value, ValueProjection, Value);
put_artifact_handler!(put_financial, FinancialSummary, Financial);

// ---- phase transitions (spec.md §6 `POST /cases/{case_id}/prd/{submit|approve|reject}` and analogues) ----

fn phase_or_400(slug: &str) -> Result<casegen_case_store::Phase, ApiError> {
    phase_from_slug(slug).ok_or_else(|| ApiError::BadRequest(format!("unknown phase '{slug}'")))
}

async fn submit_phase(
    State(state): State<Arc<AppState>>,
    Path((case_id, phase)): Path<(String, String)>,
    ctx: AuthContext,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&case_id)?;
    let phase = phase_or_400(&phase)?;
    let case = state.orchestrator.clone().submit_for_review(actor_of(ctx), case_id, phase).await?;
    Ok(Json(case))
}

async fn approve_phase(
    State(state): State<Arc<AppState>>,
    Path((case_id, phase)): Path<(String, String)>,
    ctx: AuthContext,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&case_id)?;
    let phase = phase_or_400(&phase)?;
    let case = state.orchestrator.clone().approve(actor_of(ctx), case_id, phase).await?;
    Ok(Json(case))
}

async fn reject_phase(
    State(state): State<Arc<AppState>>,
    Path((case_id, phase)): Path<(String, String)>,
    ctx: AuthContext,
    body: Option<Json<ReasonBody>>,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&case_id)?;
    let phase = phase_or_400(&phase)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let case = state.orchestrator.clone().reject(actor_of(ctx), case_id, phase, reason).await?;
    Ok(Json(case))
}

/// spec.md §6 `POST /cases/{case_id}/trigger/{phase}` — `ADMIN`-only
/// retrigger after a `*_REJECTED` generation failure, or of a stale
/// downstream phase (spec.md §9).
async fn trigger_phase(
    State(state): State<Arc<AppState>>,
    Path((case_id, phase)): Path<(String, String)>,
    ctx: AuthContext,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&case_id)?;
    let phase = phase_or_400(&phase)?;
    let case = state.orchestrator.clone().trigger_generation(actor_of(ctx), case_id, phase).await?;
    Ok(Json(case))
}

// ---- final approval ----

async fn submit_final(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<String>,
    ctx: AuthContext,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&case_id)?;
    let case = state.orchestrator.clone().submit_final(actor_of(ctx), case_id).await?;
    Ok(Json(case))
}

async fn approve_final(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<String>,
    ctx: AuthContext,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&case_id)?;
    let case = state.orchestrator.clone().approve_final(actor_of(ctx), case_id).await?;
    Ok(Json(case))
}

async fn reject_final(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<String>,
    ctx: AuthContext,
    body: Option<Json<ReasonBody>>,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&case_id)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let case = state.orchestrator.clone().reject_final(actor_of(ctx), case_id, reason).await?;
    Ok(Json(case))
}
