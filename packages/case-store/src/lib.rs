//! Case Store — the durable case record and its persistence contract.
//!
//! Implements spec.md §3 (Data Model) and §4.1 (Case Store). The contract is
//! intentionally a trait (`CaseStore`) so the orchestrator can be driven
//! against `MemoryCaseStore` in tests and swapped for a real document-store
//! adapter without touching the state machine or orchestrator.

pub mod error;
pub mod model;
pub mod store;

pub use error::{StoreError, ValidationError};
pub use model::{
    Case, CaseId, Cents, CostEstimate, CostLineItem, EffortEstimate, FinancialSummary,
    HistoryEntry, Phase, PrdDraft, RateCardSnapshot, RelevantLink, Role, RoleHours,
    ScenarioCase, Source, Status, SystemDesign, ValueProjection, ValueScenario,
};
pub use store::{CaseStore, MemoryCaseStore, StatusFilter};
