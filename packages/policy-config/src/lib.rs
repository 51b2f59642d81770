//! Policy Config — spec.md §4.7.
//!
//! Currently a single knob: which `Role` stands in for `FinalApprover` when
//! deciding `ApproveFinal`/`RejectFinal` authorization. Kept as its own
//! crate, separate from `casegen-orchestrator::Config`, because unlike the
//! orchestrator's env-var bootstrap settings this one is meant to change
//! while the process is running (spec.md S6: "policy change mid-flight").
//!
//! Guarded the same way the prompt catalog guards its map: one
//! `parking_lot::RwLock`, snapshot-read on the hot path, write-lock only on
//! the rare admin update.

use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

use casegen_case_store::Role;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("'{0}' is not a role that can act as final approver")]
    UnknownRole(String),
}

/// spec.md §3 fixes the final-approver domain to exactly five roles; the
/// other two `Role` variants (`TechnicalArchitect`, `FinanceApprover`) are
/// legitimate actor roles elsewhere but can never be named here.
fn parse_role(name: &str) -> Result<Role, PolicyError> {
    match name {
        "ADMIN" => Ok(Role::Admin),
        "DEVELOPER" => Ok(Role::Developer),
        "SALES_MANAGER_APPROVER" => Ok(Role::SalesManagerApprover),
        "FINAL_APPROVER" => Ok(Role::FinalApprover),
        "CASE_INITIATOR" => Ok(Role::CaseInitiator),
        other => Err(PolicyError::UnknownRole(other.to_string())),
    }
}

/// Read-only snapshot handed to the workflow crate at decision time. Carries
/// `generation` so a caller that cached a snapshot can tell it's gone stale
/// without re-acquiring the lock on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySnapshot {
    pub final_approver_role: Role,
    pub generation: u64,
}

struct PolicyState {
    final_approver_role: Role,
    generation: u64,
}

pub struct PolicyConfig {
    state: RwLock<PolicyState>,
}

impl PolicyConfig {
    /// `default_role_name` is the env-configured default (spec.md §6:
    /// `FINAL_APPROVER_ROLE_NAME`, default `FINAL_APPROVER`).
    pub fn new(default_role_name: &str) -> Result<Arc<Self>, PolicyError> {
        let final_approver_role = parse_role(default_role_name)?;
        Ok(Arc::new(Self {
            state: RwLock::new(PolicyState {
                final_approver_role,
                generation: 0,
            }),
        }))
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        let state = self.state.read();
        PolicySnapshot {
            final_approver_role: state.final_approver_role,
            generation: state.generation,
        }
    }

    pub fn final_approver_role(&self) -> Role {
        self.state.read().final_approver_role
    }

    /// Single writer section: validate, then replace and bump the
    /// generation in one critical section so concurrent readers never
    /// observe a role change without the generation moving too.
    pub fn set_final_approver_role(&self, role_name: &str) -> Result<PolicySnapshot, PolicyError> {
        let role = parse_role(role_name)?;
        let mut state = self.state.write();
        state.final_approver_role = role;
        state.generation += 1;
        Ok(PolicySnapshot {
            final_approver_role: state.final_approver_role,
            generation: state.generation,
        })
    }
}
