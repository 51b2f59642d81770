//! The Orchestrator (spec.md §4.3): authorizes events against the workflow
//! state machine, commits transitions with optimistic-concurrency retry, and
//! dispatches agent runs as side effects. Mirrors how the teacher's
//! `Coordinator` composes a `LockManager` + `PriorityQueue` behind one async
//! API (`packages/arbiter/src/coordinator.rs`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use casegen_agents::{AgentError, AgentRunner, Artifact, CaseSnapshot};
use casegen_case_store::{
    Case, CaseId, CaseStore, HistoryEntry, Phase, RelevantLink, Role, Source, Status, StatusFilter,
    StoreError,
};
use casegen_policy_config::PolicyConfig;
use casegen_workflow::{can_act, decide, Actor, Event, FailureKind, HistoryDelta, SideEffect};

use crate::config::Config;
use crate::error::{map_store_err, OrchestratorError};

/// Who/what is responsible for a commit, for `HistoryEntry` stamping
/// (spec.md §3 `HistoryEntry`).
#[derive(Debug, Clone)]
enum Origin {
    User { user_id: String, role: Role },
    Agent,
    System,
}

/// Re-entry message an agent run posts back to the event loop on completion
/// (spec.md §5 "completion re-enters the orchestrator as an event").
enum SystemMessage {
    Completed(CaseId, Artifact),
    Failed(CaseId, Phase, FailureKind),
}

pub struct Orchestrator {
    store: Arc<dyn CaseStore>,
    policy: Arc<PolicyConfig>,
    config: Config,
    dispatch: HashMap<Phase, Arc<dyn AgentRunner>>,
    system_tx: mpsc::UnboundedSender<SystemMessage>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn CaseStore>,
        policy: Arc<PolicyConfig>,
        config: Config,
        runners: Vec<Arc<dyn AgentRunner>>,
    ) -> Arc<Self> {
        let dispatch = runners.into_iter().map(|r| (r.phase(), r)).collect();
        let (system_tx, system_rx) = mpsc::unbounded_channel();
        let orchestrator = Arc::new(Self { store, policy, config, dispatch, system_tx });

        let loop_handle = orchestrator.clone();
        tokio::spawn(async move { loop_handle.run_event_loop(system_rx).await });

        orchestrator
    }

    /// Background task that recovers agent-lifecycle events off the channel
    /// onto the normal commit path, so no request handler ever blocks
    /// waiting for an LLM call (spec.md §4.3).
    async fn run_event_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<SystemMessage>) {
        while let Some(message) = rx.recv().await {
            let result = match message {
                SystemMessage::Completed(case_id, artifact) => {
                    let phase = artifact.phase();
                    self.clone()
                        .commit_transition(case_id, Event::GenerationCompleted(phase), Some(artifact), Origin::Agent)
                        .await
                }
                SystemMessage::Failed(case_id, phase, kind) => {
                    self.clone()
                        .commit_transition(case_id, Event::GenerationFailed(phase, kind), None, Origin::System)
                        .await
                }
            };
            if let Err(err) = result {
                warn!(error = %err, "system event failed to commit");
            }
        }
    }

    // ---- authorized, user-facing operations (spec.md §6) ----

    pub async fn initiate_case(
        self: Arc<Self>,
        actor: Actor,
        title: String,
        problem_statement: String,
        relevant_links: Vec<RelevantLink>,
    ) -> Result<Case, OrchestratorError> {
        let case = Case::new(actor.user_id.clone(), title, problem_statement, relevant_links);
        let case_id = case.case_id;
        self.store.create(case).map_err(map_store_err)?;
        let origin = Origin::User { user_id: actor.user_id, role: actor.role };
        self.commit_transition(case_id, Event::InitiateCase, None, origin).await
    }

    pub async fn edit_artifact(
        self: Arc<Self>,
        actor: Actor,
        case_id: CaseId,
        artifact: Artifact,
    ) -> Result<Case, OrchestratorError> {
        let case = self.store.get(case_id).map_err(map_store_err)?;
        let event = Event::EditArtifact(artifact.phase());
        if !can_act(&event, &actor, &case.owner_user_id, self.policy.final_approver_role()) {
            return Err(OrchestratorError::AuthorizationError);
        }
        artifact.validate()?;
        let origin = Origin::User { user_id: actor.user_id.clone(), role: actor.role };
        self.commit_transition(case_id, event, Some(artifact), origin).await
    }

    pub async fn submit_for_review(self: Arc<Self>, actor: Actor, case_id: CaseId, phase: Phase) -> Result<Case, OrchestratorError> {
        self.authorized_event(actor, case_id, Event::SubmitForReview(phase)).await
    }

    pub async fn approve(self: Arc<Self>, actor: Actor, case_id: CaseId, phase: Phase) -> Result<Case, OrchestratorError> {
        self.authorized_event(actor, case_id, Event::Approve(phase)).await
    }

    pub async fn reject(self: Arc<Self>, actor: Actor, case_id: CaseId, phase: Phase, reason: Option<String>) -> Result<Case, OrchestratorError> {
        self.authorized_event(actor, case_id, Event::Reject(phase, reason)).await
    }

    /// `ADMIN`-only retrigger of a failed generation (spec.md §6 `POST
    /// /cases/{case_id}/trigger/{phase}`).
    pub async fn trigger_generation(self: Arc<Self>, actor: Actor, case_id: CaseId, phase: Phase) -> Result<Case, OrchestratorError> {
        self.authorized_event(actor, case_id, Event::TriggerGeneration(phase)).await
    }

    pub async fn submit_final(self: Arc<Self>, actor: Actor, case_id: CaseId) -> Result<Case, OrchestratorError> {
        self.authorized_event(actor, case_id, Event::SubmitFinal).await
    }

    pub async fn approve_final(self: Arc<Self>, actor: Actor, case_id: CaseId) -> Result<Case, OrchestratorError> {
        self.authorized_event(actor, case_id, Event::ApproveFinal).await
    }

    pub async fn reject_final(self: Arc<Self>, actor: Actor, case_id: CaseId, reason: Option<String>) -> Result<Case, OrchestratorError> {
        self.authorized_event(actor, case_id, Event::RejectFinal(reason)).await
    }

    async fn authorized_event(self: Arc<Self>, actor: Actor, case_id: CaseId, event: Event) -> Result<Case, OrchestratorError> {
        let case = self.store.get(case_id).map_err(map_store_err)?;
        if !can_act(&event, &actor, &case.owner_user_id, self.policy.final_approver_role()) {
            return Err(OrchestratorError::AuthorizationError);
        }
        let origin = Origin::User { user_id: actor.user_id.clone(), role: actor.role };
        self.commit_transition(case_id, event, None, origin).await
    }

    // ---- reads ----

    pub fn get_case(&self, case_id: CaseId) -> Result<Case, OrchestratorError> {
        self.store.get(case_id).map_err(map_store_err)
    }

    pub fn list_owned(&self, owner_id: &str, filter: &StatusFilter) -> Vec<Case> {
        self.store.list_by_owner(owner_id, filter)
    }

    pub fn list_for_role(&self, role: Role, filter: &StatusFilter) -> Vec<Case> {
        self.store.list_by_role(role, filter)
    }

    // ---- commit path (spec.md §4.3 steps 1-6) ----

    /// Steps 1–6 of spec.md §4.3: load, decide, commit with optimistic-
    /// concurrency retry, dispatch side effects. Authorization (step 2 in
    /// spec.md's numbering) has already happened by the time this is called;
    /// `decide` only judges legality from the current status.
    async fn commit_transition(
        self: Arc<Self>,
        case_id: CaseId,
        event: Event,
        artifact: Option<Artifact>,
        origin: Origin,
    ) -> Result<Case, OrchestratorError> {
        let mut attempt = 0u32;
        loop {
            let case = self.store.get(case_id).map_err(map_store_err)?;
            let transition = decide(&case, event.clone())?;
            if transition.no_op {
                return Ok(case);
            }

            let expected_version = case.version;
            let next_status = transition.next_status;
            let history_deltas = transition.history.clone();
            let side_effects = transition.side_effects.clone();
            let stale_added = transition.stale_added.clone();
            let stale_cleared = transition.stale_cleared;
            let artifact_for_commit = artifact.clone();
            let origin_for_commit = origin.clone();
            let now = Utc::now();

            let mutate_result = self.store.atomic_update(
                case_id,
                expected_version,
                Box::new(move |current| {
                    let mut next = current.clone();
                    if let Some(artifact) = artifact_for_commit {
                        apply_artifact(&mut next, artifact);
                    }
                    next.status = next_status;
                    for phase in &stale_added {
                        if !next.stale_phases.contains(phase) {
                            next.stale_phases.push(*phase);
                        }
                    }
                    if let Some(phase) = stale_cleared {
                        next.stale_phases.retain(|p| *p != phase);
                    }
                    let history = history_deltas
                        .into_iter()
                        .map(|delta| stamp_history(delta, &origin_for_commit, now))
                        .collect();
                    Ok((next, history))
                }),
            );

            match mutate_result {
                Ok(updated) => {
                    for effect in side_effects {
                        self.clone().dispatch_side_effect(case_id, effect);
                    }
                    return Ok(updated);
                }
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < self.config.concurrency_retry_limit => {
                    attempt += 1;
                    tokio::time::sleep(Config::concurrency_backoff(attempt)).await;
                    continue;
                }
                Err(err) => return Err(map_store_err(err)),
            }
        }
    }

    fn dispatch_side_effect(self: Arc<Self>, case_id: CaseId, effect: SideEffect) {
        match effect {
            SideEffect::Dispatch(phase) => {
                let orchestrator = self.clone();
                tokio::spawn(async move { orchestrator.run_agent(case_id, phase).await });
            }
        }
    }

    /// Runs one agent to completion (with the LLM retry/backoff schedule of
    /// spec.md §4.4), then posts the outcome back onto the event loop. Never
    /// returns a `Result` to its caller: `dispatch_side_effect` treats
    /// scheduling as best-effort (spec.md §4.3 step 6), any eventual failure
    /// re-enters as `GenerationFailed`.
    async fn run_agent(self: Arc<Self>, case_id: CaseId, phase: Phase) {
        let Some(runner) = self.dispatch.get(&phase).cloned() else {
            warn!(?phase, "no agent runner registered for this phase");
            return;
        };

        if let Err(err) = self
            .clone()
            .commit_transition(case_id, Event::GenerationStarted(phase), None, Origin::System)
            .await
        {
            warn!(error = %err, ?phase, "failed to record generation start");
        }

        let mut attempt = 0u32;
        loop {
            let case = match self.store.get(case_id) {
                Ok(case) => case,
                Err(err) => {
                    warn!(error = %err, "case disappeared before agent run could execute");
                    return;
                }
            };
            let snapshot = CaseSnapshot::from_case(&case);

            let outcome = match tokio::time::timeout(self.config.generation_timeout(), runner.run(&snapshot)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(AgentError::LlmTimeout),
            };

            match outcome {
                Ok(artifact) => {
                    let _ = self.system_tx.send(SystemMessage::Completed(case_id, artifact));
                    return;
                }
                Err(agent_err) if agent_err.is_retryable() && attempt < self.config.llm_retry_limit => {
                    attempt += 1;
                    info!(?phase, attempt, "retrying agent run after retryable failure");
                    tokio::time::sleep(Config::agent_retry_backoff(attempt)).await;
                    continue;
                }
                Err(agent_err) => {
                    let kind = failure_kind_for(&agent_err);
                    let _ = self.system_tx.send(SystemMessage::Failed(case_id, phase, kind));
                    return;
                }
            }
        }
    }

    // ---- recovery sweep (spec.md §5 / §7) ----

    /// Spawns the background sweep that re-dispatches cases stuck in an
    /// in-flight status whose generation produced no follow-up event within
    /// `generation_timeout_ms` — the process-crash recovery path spec.md §5
    /// describes.
    pub fn spawn_recovery_sweep(self: &Arc<Self>, interval: Duration) {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                orchestrator.clone().run_recovery_sweep().await;
            }
        });
    }

    async fn run_recovery_sweep(self: Arc<Self>) {
        let cutoff = Utc::now() - chrono::Duration::milliseconds(self.config.generation_timeout_ms as i64);
        for case in self.store.list_stale_in_flight(cutoff) {
            if let Some(phase) = phase_for_in_flight_status(case.status) {
                info!(case_id = %case.case_id, ?phase, "recovery sweep re-dispatching stale generation");
                self.clone().dispatch_side_effect(case.case_id, SideEffect::Dispatch(phase));
            }
        }
    }
}

fn apply_artifact(case: &mut Case, artifact: Artifact) {
    match artifact {
        Artifact::Prd(draft) => case.prd_draft = Some(draft),
        Artifact::SystemDesign(design) => case.system_design = Some(design),
        Artifact::Effort(estimate) => case.effort_estimate = Some(estimate),
        Artifact::Cost(estimate) => case.cost_estimate = Some(estimate),
        Artifact::Value(projection) => case.value_projection = Some(projection),
        Artifact::Financial(summary) => case.financial_summary = Some(summary),
    }
}

fn stamp_history(delta: HistoryDelta, origin: &Origin, now: DateTime<Utc>) -> HistoryEntry {
    let (actor_user_id, actor_role, source) = match origin {
        Origin::User { user_id, role } => (Some(user_id.clone()), Some(*role), Source::User),
        Origin::Agent => (None, None, Source::Agent),
        Origin::System => (None, None, Source::System),
    };
    HistoryEntry {
        timestamp: now,
        actor_user_id,
        actor_role,
        source,
        event_kind: delta.event_kind,
        from_status: delta.from_status,
        to_status: delta.to_status,
        message: delta.message,
        artifact_ref: delta.artifact_ref,
    }
}

fn failure_kind_for(err: &AgentError) -> FailureKind {
    match err {
        AgentError::PromptMissing(_) => FailureKind::PromptMissing,
        AgentError::LlmUnavailable(_) => FailureKind::LlmUnavailable,
        AgentError::LlmTimeout => FailureKind::LlmTimeout,
        AgentError::ParseFailure(_) => FailureKind::ParseFailure,
        AgentError::InvariantViolation(_) => FailureKind::InvariantViolation,
        AgentError::DependencyMissing(_) => FailureKind::DependencyMissing,
    }
}

fn phase_for_in_flight_status(status: Status) -> Option<Phase> {
    match status {
        Status::PrdDrafting => Some(Phase::Prd),
        Status::SystemDesignDrafting => Some(Phase::SystemDesign),
        Status::PlanningInProgress => Some(Phase::Effort),
        Status::CostingInProgress => Some(Phase::Cost),
        Status::ValueAnalysisInProgress => Some(Phase::Value),
        Status::FinancialModelInProgress => Some(Phase::Financial),
        _ => None,
    }
}
