//! Agent Runners — spec.md §4.4.
//!
//! Six stateless, idempotent specialists behind one `AgentRunner` trait. The
//! orchestrator holds a `Phase -> Arc<dyn AgentRunner>` dispatch table built
//! from these.

pub mod architect;
pub mod contract;
pub mod cost_analyst;
pub mod error;
pub mod financial_model;
pub mod llm;
pub mod planner;
pub mod product_manager;
pub mod sales_value_analyst;

pub use architect::ArchitectAgent;
pub use contract::{AgentRunner, Artifact, CaseSnapshot};
pub use cost_analyst::CostAnalystAgent;
pub use error::AgentError;
pub use financial_model::FinancialModelAgent;
pub use llm::{LlmBackend, LlmRequest, StubLlmBackend};
pub use planner::PlannerAgent;
pub use product_manager::ProductManagerAgent;
pub use sales_value_analyst::SalesValueAnalystAgent;
