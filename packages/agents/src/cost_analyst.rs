use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use casegen_case_store::{Cents, CostEstimate, CostLineItem, Phase};
use casegen_prompt_catalog::PromptCatalog;
use casegen_registry::RateCardRegistry;

use crate::contract::{AgentRunner, Artifact, CaseSnapshot};
use crate::error::AgentError;
use crate::llm::{LlmBackend, LlmRequest};

pub const AGENT_NAME: &str = "cost_analyst";
pub const AGENT_FUNCTION: &str = "estimate_cost";

#[derive(Debug, Deserialize)]
struct CostNarrative {
    calculation_method: String,
    notes: Option<String>,
}

/// Prices the effort estimate against the active rate card (spec.md §4.4
/// table, row 4). Per-role rate resolution and the `total_cost` arithmetic
/// are computed directly from `RateCardRegistry`, not asked of the LLM — the
/// LLM only supplies the narrative (`calculation_method`/`notes`), which
/// keeps the arithmetic invariant unconditionally true rather than merely
/// checked after the fact.
pub struct CostAnalystAgent {
    catalog: Arc<PromptCatalog>,
    llm: Arc<dyn LlmBackend>,
    rate_cards: Arc<RateCardRegistry>,
    rate_card_id: String,
}

impl CostAnalystAgent {
    pub fn new(
        catalog: Arc<PromptCatalog>,
        llm: Arc<dyn LlmBackend>,
        rate_cards: Arc<RateCardRegistry>,
        rate_card_id: impl Into<String>,
    ) -> Self {
        Self { catalog, llm, rate_cards, rate_card_id: rate_card_id.into() }
    }
}

#[async_trait]
impl AgentRunner for CostAnalystAgent {
    fn phase(&self) -> Phase {
        Phase::Cost
    }

    async fn run(&self, snapshot: &CaseSnapshot) -> Result<Artifact, AgentError> {
        let effort = snapshot
            .effort_estimate
            .as_ref()
            .ok_or_else(|| AgentError::DependencyMissing("effort_estimate".to_string()))?;

        let rate_card = self.rate_cards.get(&self.rate_card_id)?;

        let mut values = HashMap::new();
        values.insert("title".to_string(), snapshot.title.clone());
        values.insert("case_id".to_string(), snapshot.case_id.to_string());
        values.insert(
            "effort_summary".to_string(),
            format!("{} total hours across {} roles", effort.total_hours, effort.roles.len()),
        );

        let rendered = self.catalog.resolve_active(AGENT_NAME, AGENT_FUNCTION, &values)?;

        let raw = self
            .llm
            .complete(LlmRequest {
                agent_name: AGENT_NAME.to_string(),
                agent_function: AGENT_FUNCTION.to_string(),
                prompt: rendered.text,
            })
            .await?;

        let narrative: CostNarrative =
            serde_json::from_str(&raw).map_err(|e| AgentError::ParseFailure(e.to_string()))?;

        let role_names: Vec<String> = effort.roles.iter().map(|r| r.role.clone()).collect();
        let snapshot_rates = rate_card.snapshot_for(&role_names);

        let breakdown: Vec<CostLineItem> = effort
            .roles
            .iter()
            .map(|r| {
                let hourly_rate = rate_card.resolve_role_rate(&r.role);
                CostLineItem {
                    role: r.role.clone(),
                    hours: r.hours,
                    hourly_rate,
                    total_cost: Cents(r.hours as i64 * hourly_rate.0),
                }
            })
            .collect();
        let estimated_cost: Cents = breakdown.iter().map(|i| i.total_cost).sum();

        let estimate = CostEstimate {
            breakdown,
            estimated_cost,
            currency: "USD".to_string(),
            rate_card: snapshot_rates,
            calculation_method: narrative.calculation_method,
            notes: narrative.notes,
        };
        estimate.validate()?;
        Ok(Artifact::Cost(estimate))
    }
}
