//! In-memory adapter for the persistence contract in spec.md §4.1.
//!
//! Modeled after the teacher's `StateStore`/`LockManager`: a
//! `parking_lot::RwLock` guarding a `HashMap`, with a single write-lock
//! critical section per mutation so the "per-case linearizability" contract
//! holds without a cross-case lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::model::{Case, CaseId, HistoryEntry, Role, Status};

/// Filter for a reviewer inbox query (spec.md §4.1 `list_by_role`).
#[derive(Debug, Clone, Default)]
pub struct StatusFilter {
    pub statuses: Option<Vec<Status>>,
}

impl StatusFilter {
    pub fn any() -> Self {
        Self { statuses: None }
    }

    pub fn matches(&self, status: Status) -> bool {
        match &self.statuses {
            None => true,
            Some(set) => set.contains(&status),
        }
    }
}

/// The persistence contract cases are read and mutated through.
///
/// `atomic_update` is the only mutation path: the mutator receives the
/// current case and returns the new case plus the history entries to append,
/// and the commit is rejected if `expected_version` no longer matches what is
/// stored (spec.md §4.1, optimistic concurrency).
pub trait CaseStore: Send + Sync {
    fn create(&self, case: Case) -> Result<(), StoreError>;

    fn get(&self, case_id: CaseId) -> Result<Case, StoreError>;

    fn atomic_update(
        &self,
        case_id: CaseId,
        expected_version: u64,
        mutator: Box<dyn FnOnce(&Case) -> Result<(Case, Vec<HistoryEntry>), StoreError> + Send>,
    ) -> Result<Case, StoreError>;

    fn list_by_owner(&self, owner_id: &str, filter: &StatusFilter) -> Vec<Case>;

    /// Reviewer inboxes: cases in one of `statuses` (role is informational,
    /// passed through so a real backend could index by (role, status)).
    fn list_by_role(&self, _role: Role, filter: &StatusFilter) -> Vec<Case>;

    /// Used by the recovery sweep (spec.md §7): cases sitting in an in-flight
    /// status whose `updated_at` predates `older_than` with no history event
    /// since.
    fn list_stale_in_flight(&self, older_than: chrono::DateTime<chrono::Utc>) -> Vec<Case>;
}

#[derive(Default)]
pub struct MemoryCaseStore {
    cases: RwLock<HashMap<CaseId, Case>>,
}

impl MemoryCaseStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

const IN_FLIGHT_STATUSES: &[Status] = &[
    Status::PrdDrafting,
    Status::SystemDesignDrafting,
    Status::PlanningInProgress,
    Status::CostingInProgress,
    Status::ValueAnalysisInProgress,
    Status::FinancialModelInProgress,
];

impl CaseStore for MemoryCaseStore {
    fn create(&self, case: Case) -> Result<(), StoreError> {
        let mut cases = self.cases.write();
        if cases.contains_key(&case.case_id) {
            return Err(StoreError::Conflict(case.case_id.to_string()));
        }
        cases.insert(case.case_id, case);
        Ok(())
    }

    fn get(&self, case_id: CaseId) -> Result<Case, StoreError> {
        self.cases
            .read()
            .get(&case_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(case_id.to_string()))
    }

    fn atomic_update(
        &self,
        case_id: CaseId,
        expected_version: u64,
        mutator: Box<dyn FnOnce(&Case) -> Result<(Case, Vec<HistoryEntry>), StoreError> + Send>,
    ) -> Result<Case, StoreError> {
        let mut cases = self.cases.write();
        let current = cases
            .get(&case_id)
            .ok_or_else(|| StoreError::NotFound(case_id.to_string()))?;

        if current.version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                case_id: case_id.to_string(),
                expected: expected_version,
                actual: current.version,
            });
        }

        let (mut next, history_delta) = mutator(current)?;

        // Re-check immediately before commit: the mutator itself does no I/O
        // so no other writer could have raced in between, but this keeps the
        // invariant explicit rather than implicit in lock scoping.
        let still_current = cases
            .get(&case_id)
            .expect("case present under write lock");
        if still_current.version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                case_id: case_id.to_string(),
                expected: expected_version,
                actual: still_current.version,
            });
        }

        next.version = expected_version + 1;
        next.updated_at = chrono::Utc::now();
        next.history.extend(history_delta);

        cases.insert(case_id, next.clone());
        Ok(next)
    }

    fn list_by_owner(&self, owner_id: &str, filter: &StatusFilter) -> Vec<Case> {
        self.cases
            .read()
            .values()
            .filter(|c| c.owner_user_id == owner_id && filter.matches(c.status))
            .cloned()
            .collect()
    }

    fn list_by_role(&self, _role: Role, filter: &StatusFilter) -> Vec<Case> {
        self.cases
            .read()
            .values()
            .filter(|c| filter.matches(c.status))
            .cloned()
            .collect()
    }

    fn list_stale_in_flight(&self, older_than: chrono::DateTime<chrono::Utc>) -> Vec<Case> {
        self.cases
            .read()
            .values()
            .filter(|c| IN_FLIGHT_STATUSES.contains(&c.status) && c.updated_at < older_than)
            .cloned()
            .collect()
    }
}
