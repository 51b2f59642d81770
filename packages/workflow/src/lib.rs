//! Workflow State Machine — spec.md §4.2.
//!
//! A pure function over `(current_status, event, actor_role)`. No I/O: the
//! orchestrator crate is the only consumer that touches persistence or the
//! agent runners.

pub mod eligibility;
pub mod events;
pub mod transitions;

pub use eligibility::can_act;
pub use events::{Actor, Event, FailureKind};
pub use transitions::{decide, HistoryDelta, SideEffect, Transition, WorkflowError};
