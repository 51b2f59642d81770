use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use casegen_case_store::{Cents, Phase, ScenarioCase, ValueProjection, ValueScenario};
use casegen_prompt_catalog::PromptCatalog;
use casegen_registry::PricingTemplateRegistry;

use crate::contract::{AgentRunner, Artifact, CaseSnapshot};
use crate::error::AgentError;
use crate::llm::{LlmBackend, LlmRequest};

pub const AGENT_NAME: &str = "sales_value_analyst";
pub const AGENT_FUNCTION: &str = "project_value";

#[derive(Debug, Deserialize)]
struct ValueResponse {
    low_cents: i64,
    base_cents: i64,
    high_cents: i64,
    low_description: Option<String>,
    base_description: Option<String>,
    high_description: Option<String>,
    assumptions: Vec<String>,
}

/// Projects Low/Base/High value scenarios against the chosen pricing
/// template (spec.md §4.4 table, row 5). Monotonicity is enforced by
/// `ValueProjection::validate` after the LLM's numbers are assembled into
/// scenarios — the template registry already rejected templates that could
/// never satisfy it (see `casegen_registry::PricingTemplateRegistry`), but a
/// per-case LLM response can still violate it for this specific case.
pub struct SalesValueAnalystAgent {
    catalog: Arc<PromptCatalog>,
    llm: Arc<dyn LlmBackend>,
    templates: Arc<PricingTemplateRegistry>,
    template_id: String,
}

impl SalesValueAnalystAgent {
    pub fn new(
        catalog: Arc<PromptCatalog>,
        llm: Arc<dyn LlmBackend>,
        templates: Arc<PricingTemplateRegistry>,
        template_id: impl Into<String>,
    ) -> Self {
        Self { catalog, llm, templates, template_id: template_id.into() }
    }
}

#[async_trait]
impl AgentRunner for SalesValueAnalystAgent {
    fn phase(&self) -> Phase {
        Phase::Value
    }

    async fn run(&self, snapshot: &CaseSnapshot) -> Result<Artifact, AgentError> {
        let cost = snapshot
            .cost_estimate
            .as_ref()
            .ok_or_else(|| AgentError::DependencyMissing("cost_estimate".to_string()))?;
        snapshot
            .effort_estimate
            .as_ref()
            .ok_or_else(|| AgentError::DependencyMissing("effort_estimate".to_string()))?;

        let template = self.templates.get(&self.template_id)?;

        let mut values = HashMap::new();
        values.insert("title".to_string(), snapshot.title.clone());
        values.insert("estimated_cost_cents".to_string(), cost.estimated_cost.0.to_string());
        values.insert("methodology".to_string(), template.methodology.clone());

        let rendered = self.catalog.resolve_active(AGENT_NAME, AGENT_FUNCTION, &values)?;

        let raw = self
            .llm
            .complete(LlmRequest {
                agent_name: AGENT_NAME.to_string(),
                agent_function: AGENT_FUNCTION.to_string(),
                prompt: rendered.text,
            })
            .await?;

        let parsed: ValueResponse =
            serde_json::from_str(&raw).map_err(|e| AgentError::ParseFailure(e.to_string()))?;

        let projection = ValueProjection {
            scenarios: vec![
                ValueScenario { case: ScenarioCase::Low, value: Cents(parsed.low_cents), description: parsed.low_description },
                ValueScenario { case: ScenarioCase::Base, value: Cents(parsed.base_cents), description: parsed.base_description },
                ValueScenario { case: ScenarioCase::High, value: Cents(parsed.high_cents), description: parsed.high_description },
            ],
            currency: cost.currency.clone(),
            template_id: template.id.clone(),
            methodology: template.methodology.clone(),
            assumptions: parsed.assumptions,
        };
        projection.validate()?;
        Ok(Artifact::Value(projection))
    }
}
