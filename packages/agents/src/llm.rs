//! LLM backend connector — the only agent dependency that reaches outside
//! the process. Grounded on the teacher's `connectors::mock` pattern: a
//! config-driven in-memory double with a `with_failure`/`with_latency`
//! builder, so the rest of the crate never imports a real HTTP client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::AgentError;

/// One rendered prompt plus enough addressing for a stub/mock backend to key
/// a canned response by agent identity, without the backend needing to
/// understand artifact shapes.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub agent_name: String,
    pub agent_function: String,
    pub prompt: String,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<String, AgentError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    Unavailable,
    Timeout,
}

fn key(agent_name: &str, agent_function: &str) -> String {
    format!("{agent_name}::{agent_function}")
}

/// Deterministic in-memory stand-in for the real LLM endpoint, used by
/// tests and local runs (spec.md §4.4 "LLM backend").
#[derive(Default)]
pub struct StubLlmBackend {
    responses: RwLock<HashMap<String, String>>,
    failures: RwLock<HashMap<String, FailureMode>>,
    latency: RwLock<Duration>,
}

impl StubLlmBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register the canned body `complete` returns for `(agent_name, agent_function)`.
    pub fn set_response(&self, agent_name: &str, agent_function: &str, body: impl Into<String>) {
        self.responses.write().insert(key(agent_name, agent_function), body.into());
    }

    pub fn set_unavailable(&self, agent_name: &str, agent_function: &str) {
        self.failures.write().insert(key(agent_name, agent_function), FailureMode::Unavailable);
    }

    pub fn set_timeout(&self, agent_name: &str, agent_function: &str) {
        self.failures.write().insert(key(agent_name, agent_function), FailureMode::Timeout);
    }

    pub fn clear_failure(&self, agent_name: &str, agent_function: &str) {
        self.failures.write().remove(&key(agent_name, agent_function));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }
}

#[async_trait]
impl LlmBackend for StubLlmBackend {
    async fn complete(&self, request: LlmRequest) -> Result<String, AgentError> {
        let k = key(&request.agent_name, &request.agent_function);

        if let Some(mode) = self.failures.read().get(&k).copied() {
            return match mode {
                FailureMode::Unavailable => Err(AgentError::LlmUnavailable(format!(
                    "stub backend configured to fail for {k}"
                ))),
                FailureMode::Timeout => Err(AgentError::LlmTimeout),
            };
        }

        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.responses
            .read()
            .get(&k)
            .cloned()
            .ok_or_else(|| AgentError::LlmUnavailable(format!("no canned response registered for {k}")))
    }
}
