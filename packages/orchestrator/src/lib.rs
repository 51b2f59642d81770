//! Orchestrator: wires the case store, workflow state machine, and agent
//! runners into the single coordinator spec.md §4.3 describes.

pub mod config;
pub mod error;
pub mod orchestrator;

pub use config::Config;
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
