//! The pure `(status, event) -> transition` function (spec.md §4.2).
//!
//! No I/O, no async: this module never imports `tokio` or the case store's
//! persistence trait, only its plain data types.

use thiserror::Error;

use casegen_case_store::{Case, Phase, Status};

use crate::events::{Event, FailureKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("event {event:?} is not legal from status {from:?}")]
    InvalidTransition { from: Status, event: String },

    #[error("case has stale downstream artifacts for phases {0:?}; retrigger before submitting final")]
    StaleArtifacts(Vec<Phase>),
}

/// A side effect the orchestrator must carry out after committing a
/// transition. The state machine only ever names a phase to dispatch; it
/// never calls into the agent runners itself (spec.md §4.2 "State Machine is
/// pure").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    Dispatch(Phase),
}

/// One appended history record, prior to timestamp/actor stamping (the
/// orchestrator fills those in since the state machine has no clock access
/// of its own design intent — chrono::Utc::now() is a pure function call but
/// keeping it out of this module keeps transitions trivially reproducible in
/// tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDelta {
    pub from_status: Status,
    pub to_status: Status,
    pub event_kind: String,
    pub message: Option<String>,
    pub artifact_ref: Option<Phase>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next_status: Status,
    pub history: Vec<HistoryDelta>,
    pub side_effects: Vec<SideEffect>,
    /// True for `GenerationCompleted`/`GenerationFailed` replays that arrive
    /// after the case has already moved on (spec.md §8 property 5): the
    /// caller should commit nothing and append no history.
    pub no_op: bool,
    /// Phases newly marked stale by this transition (spec.md §9 resolution:
    /// re-editing an approved upstream artifact stales its downstream
    /// dependents without touching their stored artifacts).
    pub stale_added: Vec<Phase>,
    /// A phase whose staleness this transition clears, because it was just
    /// regenerated (spec.md §9: "until each stale phase is explicitly
    /// retriggered").
    pub stale_cleared: Option<Phase>,
}

impl Transition {
    fn single(from: Status, to: Status, event_kind: &str, message: Option<String>, artifact_ref: Option<Phase>) -> Self {
        Self {
            next_status: to,
            history: vec![HistoryDelta {
                from_status: from,
                to_status: to,
                event_kind: event_kind.to_string(),
                message,
                artifact_ref,
            }],
            side_effects: vec![],
            no_op: false,
            stale_added: vec![],
            stale_cleared: None,
        }
    }

    fn no_op(status: Status) -> Self {
        Self {
            next_status: status,
            history: vec![],
            side_effects: vec![],
            no_op: true,
            stale_added: vec![],
            stale_cleared: None,
        }
    }

    fn with_side_effect(mut self, effect: SideEffect) -> Self {
        self.side_effects.push(effect);
        self
    }

    fn with_stale_added(mut self, phases: Vec<Phase>) -> Self {
        self.stale_added = phases;
        self
    }

    fn with_stale_cleared(mut self, phase: Phase) -> Self {
        self.stale_cleared = Some(phase);
        self
    }

    fn chain(mut self, to: Status, event_kind: &str, artifact_ref: Option<Phase>) -> Self {
        let from = self.next_status;
        self.history.push(HistoryDelta {
            from_status: from,
            to_status: to,
            event_kind: event_kind.to_string(),
            message: None,
            artifact_ref,
        });
        self.next_status = to;
        self
    }
}

struct PhaseStatuses {
    in_flight: Status,
    complete: Option<Status>,
    pending_review: Status,
    approved: Status,
    rejected: Status,
}

fn statuses_for(phase: Phase) -> PhaseStatuses {
    match phase {
        Phase::Prd => PhaseStatuses {
            in_flight: Status::PrdDrafting,
            complete: None,
            pending_review: Status::PrdReview,
            approved: Status::PrdApproved,
            rejected: Status::PrdRejected,
        },
        Phase::SystemDesign => PhaseStatuses {
            in_flight: Status::SystemDesignDrafting,
            complete: Some(Status::SystemDesignDrafted),
            pending_review: Status::SystemDesignPendingReview,
            approved: Status::SystemDesignApproved,
            rejected: Status::SystemDesignRejected,
        },
        Phase::Effort => PhaseStatuses {
            in_flight: Status::PlanningInProgress,
            complete: Some(Status::PlanningComplete),
            pending_review: Status::EffortPendingReview,
            approved: Status::EffortApproved,
            rejected: Status::EffortRejected,
        },
        Phase::Cost => PhaseStatuses {
            in_flight: Status::CostingInProgress,
            complete: Some(Status::CostingComplete),
            pending_review: Status::CostingPendingReview,
            approved: Status::CostingApproved,
            rejected: Status::CostingRejected,
        },
        Phase::Value => PhaseStatuses {
            in_flight: Status::ValueAnalysisInProgress,
            complete: Some(Status::ValueAnalysisComplete),
            pending_review: Status::ValuePendingReview,
            approved: Status::ValueApproved,
            rejected: Status::ValueRejected,
        },
        Phase::Financial => PhaseStatuses {
            in_flight: Status::FinancialModelInProgress,
            complete: Some(Status::FinancialModelComplete),
            pending_review: Status::FinancialModelPendingReview,
            approved: Status::FinancialModelApproved,
            rejected: Status::FinancialModelRejected,
        },
    }
}

/// Phases downstream of `phase` in the fixed chain order (spec.md §4.7), i.e.
/// the phases a re-edit of `phase`'s artifact can invalidate (spec.md §9).
fn downstream_of(phase: Phase) -> Vec<Phase> {
    let start = Phase::ALL.iter().position(|p| *p == phase).expect("phase is in Phase::ALL");
    Phase::ALL[start + 1..].to_vec()
}

fn illegal(from: Status, event: &Event) -> WorkflowError {
    WorkflowError::InvalidTransition {
        from,
        event: format!("{:?}", event),
    }
}

/// Decide the next status for `case` given `event`. Assumes the caller has
/// already authorized the event via [`crate::eligibility::can_act`]; this
/// function only judges whether the transition is legal from the case's
/// current status (spec.md §8 property 2).
pub fn decide(case: &Case, event: Event) -> Result<Transition, WorkflowError> {
    let from = case.status;

    match &event {
        Event::InitiateCase => {
            if from != Status::Intake {
                return Err(illegal(from, &event));
            }
            Ok(Transition::single(from, Status::PrdDrafting, "InitiateCase", None, Some(Phase::Prd))
                .with_side_effect(SideEffect::Dispatch(Phase::Prd)))
        }

        Event::GenerationCompleted(phase) => {
            let s = statuses_for(*phase);
            if *phase == Phase::Prd {
                if from != s.in_flight {
                    return Ok(Transition::no_op(from));
                }
                Ok(Transition::single(from, s.pending_review, "GenerationCompleted", None, Some(*phase))
                    .with_stale_cleared(*phase))
            } else {
                if from != s.in_flight {
                    return Ok(Transition::no_op(from));
                }
                let complete = s.complete.expect("non-PRD phases have a complete status");
                Ok(Transition::single(from, complete, "GenerationCompleted", None, Some(*phase))
                    .with_stale_cleared(*phase))
            }
        }

        Event::GenerationStarted(phase) => {
            let s = statuses_for(*phase);
            if from != s.in_flight {
                return Ok(Transition::no_op(from));
            }
            Ok(Transition::single(from, from, "GenerationStarted", None, Some(*phase)))
        }

        Event::GenerationFailed(phase, kind) => {
            let s = statuses_for(*phase);
            if from != s.in_flight {
                return Ok(Transition::no_op(from));
            }
            let message = format!("generation failed: {:?}", kind);
            Ok(Transition::single(from, s.rejected, "GenerationFailed", Some(message), Some(*phase)))
        }

        Event::SubmitForReview(phase) => {
            let s = statuses_for(*phase);
            let legal_source = from == s.rejected || s.complete == Some(from);
            if !legal_source {
                return Err(illegal(from, &event));
            }
            Ok(Transition::single(from, s.pending_review, "SubmitForReview", None, Some(*phase)))
        }

        Event::Approve(phase) => {
            let s = statuses_for(*phase);
            if from != s.pending_review {
                return Err(illegal(from, &event));
            }
            let mut t = Transition::single(from, s.approved, "Approve", None, Some(*phase));
            if let Some(next_phase) = phase.next() {
                let next_s = statuses_for(next_phase);
                t = t
                    .chain(next_s.in_flight, "AutoDispatch", Some(next_phase))
                    .with_side_effect(SideEffect::Dispatch(next_phase));
            }
            Ok(t)
        }

        Event::Reject(phase, reason) => {
            let s = statuses_for(*phase);
            if from != s.pending_review {
                return Err(illegal(from, &event));
            }
            Ok(Transition::single(from, s.rejected, "Reject", reason.clone(), Some(*phase)))
        }

        Event::EditArtifact(phase) => {
            let s = statuses_for(*phase);
            // Status is unchanged; the orchestrator separately rewrites the
            // artifact slot. Recorded in history so the edit is auditable.
            if from == s.rejected || s.complete == Some(from) {
                Ok(Transition::single(from, from, "EditArtifact", None, Some(*phase)))
            } else if from == s.approved {
                // Re-opening an already-approved artifact (spec.md §9
                // resolution): downstream artifacts are not mutated, just
                // marked stale until explicitly retriggered.
                let downstream = downstream_of(*phase);
                Ok(Transition::single(from, from, "EditArtifact", None, Some(*phase))
                    .with_stale_added(downstream))
            } else {
                Err(illegal(from, &event))
            }
        }

        Event::TriggerGeneration(phase) => {
            let s = statuses_for(*phase);
            let stale = case.stale_phases.contains(phase);
            let legal_source = from == s.rejected || (stale && (from == s.approved || s.complete == Some(from)));
            if !legal_source {
                return Err(illegal(from, &event));
            }
            Ok(Transition::single(from, s.in_flight, "TriggerGeneration", None, Some(*phase))
                .with_side_effect(SideEffect::Dispatch(*phase)))
        }

        Event::SubmitFinal => {
            let legal_source = matches!(from, Status::FinancialModelComplete | Status::FinancialModelApproved);
            if !legal_source {
                return Err(illegal(from, &event));
            }
            if case.is_stale() {
                return Err(WorkflowError::StaleArtifacts(case.stale_phases.clone()));
            }
            Ok(Transition::single(from, Status::PendingFinalApproval, "SubmitFinal", None, None))
        }

        Event::ApproveFinal => {
            if from != Status::PendingFinalApproval {
                return Err(illegal(from, &event));
            }
            Ok(Transition::single(from, Status::Approved, "ApproveFinal", None, None))
        }

        Event::RejectFinal(reason) => {
            if from != Status::PendingFinalApproval {
                return Err(illegal(from, &event));
            }
            Ok(Transition::single(from, Status::Rejected, "RejectFinal", reason.clone(), None))
        }
    }
}
