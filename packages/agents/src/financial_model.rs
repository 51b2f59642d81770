use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use casegen_case_store::{FinancialSummary, Phase, ScenarioCase};
use casegen_prompt_catalog::PromptCatalog;

use crate::contract::{AgentRunner, Artifact, CaseSnapshot};
use crate::error::AgentError;
use crate::llm::{LlmBackend, LlmRequest};

pub const AGENT_NAME: &str = "financial_model";
pub const AGENT_FUNCTION: &str = "summarize_financials";

#[derive(Debug, Deserialize)]
struct FinancialNarrative {
    key_assumptions: Vec<String>,
    payback_period_months: Option<f64>,
}

/// Synthesizes the top-level financial summary from cost and value (spec.md
/// §4.4 table, row 6). `net_value_base` and `roi_percentage_base` are
/// computed here, not asked of the LLM, so `FinancialSummary::validate`'s
/// identities hold unconditionally; the LLM only supplies the narrative
/// assumptions and its payback estimate.
pub struct FinancialModelAgent {
    catalog: Arc<PromptCatalog>,
    llm: Arc<dyn LlmBackend>,
}

impl FinancialModelAgent {
    pub fn new(catalog: Arc<PromptCatalog>, llm: Arc<dyn LlmBackend>) -> Self {
        Self { catalog, llm }
    }
}

#[async_trait]
impl AgentRunner for FinancialModelAgent {
    fn phase(&self) -> Phase {
        Phase::Financial
    }

    async fn run(&self, snapshot: &CaseSnapshot) -> Result<Artifact, AgentError> {
        let cost = snapshot
            .cost_estimate
            .as_ref()
            .ok_or_else(|| AgentError::DependencyMissing("cost_estimate".to_string()))?;
        let value = snapshot
            .value_projection
            .as_ref()
            .ok_or_else(|| AgentError::DependencyMissing("value_projection".to_string()))?;

        let base_value = value
            .scenarios
            .iter()
            .find(|s| s.case == ScenarioCase::Base)
            .ok_or_else(|| AgentError::DependencyMissing("value_projection.base scenario".to_string()))?
            .value;

        let mut values = HashMap::new();
        values.insert("title".to_string(), snapshot.title.clone());
        values.insert("estimated_cost_cents".to_string(), cost.estimated_cost.0.to_string());
        values.insert("projected_value_base_cents".to_string(), base_value.0.to_string());

        let rendered = self.catalog.resolve_active(AGENT_NAME, AGENT_FUNCTION, &values)?;

        let raw = self
            .llm
            .complete(LlmRequest {
                agent_name: AGENT_NAME.to_string(),
                agent_function: AGENT_FUNCTION.to_string(),
                prompt: rendered.text,
            })
            .await?;

        let narrative: FinancialNarrative =
            serde_json::from_str(&raw).map_err(|e| AgentError::ParseFailure(e.to_string()))?;

        let net_value_base = base_value - cost.estimated_cost;
        let roi_percentage_base = if cost.estimated_cost.0 > 0 {
            Some(100.0 * net_value_base.0 as f64 / cost.estimated_cost.0 as f64)
        } else {
            None
        };

        let summary = FinancialSummary {
            total_estimated_cost: cost.estimated_cost,
            total_projected_value_base: base_value,
            net_value_base,
            roi_percentage_base,
            payback_period_months: narrative.payback_period_months,
            currency: cost.currency.clone(),
            key_assumptions: narrative.key_assumptions,
        };
        summary.validate()?;
        Ok(Artifact::Financial(summary))
    }
}
