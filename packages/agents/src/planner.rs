use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use casegen_case_store::{EffortEstimate, Phase, RoleHours};
use casegen_prompt_catalog::PromptCatalog;

use crate::contract::{AgentRunner, Artifact, CaseSnapshot};
use crate::error::AgentError;
use crate::llm::{LlmBackend, LlmRequest};

pub const AGENT_NAME: &str = "planner";
pub const AGENT_FUNCTION: &str = "estimate_effort";

#[derive(Debug, Deserialize)]
struct PlannerResponse {
    roles: Vec<RoleHoursJson>,
    duration_weeks: u32,
    complexity_assessment: String,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoleHoursJson {
    role: String,
    hours: u64,
}

/// Estimates effort from the PRD and system design (spec.md §4.4 table, row
/// 3). The LLM is expected to return the role/hours breakdown and duration
/// as JSON; `total_hours` is derived here rather than trusted from the LLM,
/// so the Σ roles invariant always holds by construction.
pub struct PlannerAgent {
    catalog: Arc<PromptCatalog>,
    llm: Arc<dyn LlmBackend>,
}

impl PlannerAgent {
    pub fn new(catalog: Arc<PromptCatalog>, llm: Arc<dyn LlmBackend>) -> Self {
        Self { catalog, llm }
    }
}

#[async_trait]
impl AgentRunner for PlannerAgent {
    fn phase(&self) -> Phase {
        Phase::Effort
    }

    async fn run(&self, snapshot: &CaseSnapshot) -> Result<Artifact, AgentError> {
        let prd = snapshot
            .prd_draft
            .as_ref()
            .ok_or_else(|| AgentError::DependencyMissing("prd_draft".to_string()))?;
        let design = snapshot
            .system_design
            .as_ref()
            .ok_or_else(|| AgentError::DependencyMissing("system_design".to_string()))?;

        let mut values = HashMap::new();
        values.insert("title".to_string(), snapshot.title.clone());
        values.insert("prd_markdown".to_string(), prd.content_markdown.clone());
        values.insert("system_design_markdown".to_string(), design.content_markdown.clone());

        let rendered = self.catalog.resolve_active(AGENT_NAME, AGENT_FUNCTION, &values)?;

        let raw = self
            .llm
            .complete(LlmRequest {
                agent_name: AGENT_NAME.to_string(),
                agent_function: AGENT_FUNCTION.to_string(),
                prompt: rendered.text,
            })
            .await?;

        let parsed: PlannerResponse =
            serde_json::from_str(&raw).map_err(|e| AgentError::ParseFailure(e.to_string()))?;

        let roles: Vec<RoleHours> = parsed
            .roles
            .into_iter()
            .map(|r| RoleHours { role: r.role, hours: r.hours })
            .collect();
        let total_hours = roles.iter().map(|r| r.hours).sum();

        let estimate = EffortEstimate {
            roles,
            total_hours,
            duration_weeks: parsed.duration_weeks,
            complexity_assessment: parsed.complexity_assessment,
            notes: parsed.notes,
        };
        estimate.validate()?;
        Ok(Artifact::Effort(estimate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casegen_case_store::{CaseId, PrdDraft, SystemDesign};
    use casegen_prompt_catalog::{PromptEntry, PromptVersion};
    use crate::llm::StubLlmBackend;
    use chrono::Utc;

    fn snapshot() -> CaseSnapshot {
        CaseSnapshot {
            case_id: CaseId::new(),
            title: "Patient Portal Revamp".to_string(),
            problem_statement: "...".to_string(),
            relevant_links: vec![],
            prd_draft: Some(PrdDraft { title: "t".into(), content_markdown: "# PRD".into(), version_label: "v1".into() }),
            system_design: Some(SystemDesign {
                content_markdown: "# Design".into(),
                generated_by: "architect".into(),
                version_label: "v1".into(),
                generated_at: Utc::now(),
            }),
            effort_estimate: None,
            cost_estimate: None,
            value_projection: None,
        }
    }

    fn catalog_with_prompt() -> Arc<PromptCatalog> {
        let catalog = PromptCatalog::new();
        catalog.create_prompt(PromptEntry {
            prompt_id: "planner-estimate".into(),
            agent_name: AGENT_NAME.into(),
            agent_function: AGENT_FUNCTION.into(),
            title: "Estimate Effort".into(),
            description: "".into(),
            category: "effort".into(),
            is_enabled: true,
            current_version: "v1".into(),
            versions: vec![PromptVersion {
                label: "v1".into(),
                template_text: "Estimate effort for {{title}}".into(),
                placeholders: vec!["title".into(), "prd_markdown".into(), "system_design_markdown".into()],
                description: "".into(),
                is_active: true,
                created_at: Utc::now(),
            }],
            usage_count: 0,
        });
        catalog
    }

    #[tokio::test]
    async fn derives_total_hours_from_role_breakdown() {
        let llm = StubLlmBackend::new();
        llm.set_response(
            AGENT_NAME,
            AGENT_FUNCTION,
            r#"{"roles":[{"role":"Engineer","hours":80},{"role":"Designer","hours":40}],"duration_weeks":6,"complexity_assessment":"Medium","notes":null}"#,
        );
        let agent = PlannerAgent::new(catalog_with_prompt(), llm);

        let artifact = agent.run(&snapshot()).await.unwrap();
        match artifact {
            Artifact::Effort(estimate) => {
                assert_eq!(estimate.total_hours, 120);
                assert_eq!(estimate.duration_weeks, 6);
            }
            _ => panic!("expected effort artifact"),
        }
    }

    #[tokio::test]
    async fn zero_duration_is_an_invariant_violation() {
        let llm = StubLlmBackend::new();
        llm.set_response(
            AGENT_NAME,
            AGENT_FUNCTION,
            r#"{"roles":[{"role":"Engineer","hours":80}],"duration_weeks":0,"complexity_assessment":"Low","notes":null}"#,
        );
        let agent = PlannerAgent::new(catalog_with_prompt(), llm);

        let err = agent.run(&snapshot()).await.unwrap_err();
        assert!(matches!(err, AgentError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_failure() {
        let llm = StubLlmBackend::new();
        llm.set_response(AGENT_NAME, AGENT_FUNCTION, "not json");
        let agent = PlannerAgent::new(catalog_with_prompt(), llm);

        let err = agent.run(&snapshot()).await.unwrap_err();
        assert!(matches!(err, AgentError::ParseFailure(_)));
    }
}
